//! Team and user management

use std::time::Duration;

use futures::FutureExt;

use crate::config::EngineConfig;
use crate::error::{require, Error, Resource, Result, ResultExt};
use crate::models::{Team, TeamMember, User};
use crate::store::{Directory, UnitOfWork};
use crate::unit_of_work::{run, with_deadline};

/// Creates teams and toggles user activity
pub struct DirectoryService<U> {
    uow: U,
    timeout: Duration,
}

impl<U: UnitOfWork> DirectoryService<U> {
    pub fn new(uow: U) -> Self {
        Self::from_config(uow, &EngineConfig::default())
    }

    pub fn from_config(uow: U, config: &EngineConfig) -> Self {
        Self {
            uow,
            timeout: config.operation_timeout,
        }
    }

    /// Create a team and upsert its members in one unit of work
    ///
    /// Existing users named in `members` move to the new team.
    pub async fn create_team(&self, team_name: &str, members: Vec<TeamMember>) -> Result<Team> {
        require(team_name, "team_name")?;
        if members.is_empty() {
            return Err(Error::Validation("members are required".to_string()));
        }
        for member in &members {
            require(&member.user_id, "user_id")?;
            require(&member.username, "username")?;
        }

        let name = team_name.to_string();
        let team = with_deadline(
            self.timeout,
            run(&self.uow, move |s| {
                async move {
                    if s.team_exists(&name).await.context("check team exists")? {
                        return Err(Error::AlreadyExists(Resource::Team(name.clone())));
                    }
                    s.create_team(&name).await.context("create team")?;

                    for member in members {
                        let user = member.into_user(&name);
                        s.upsert_user(&user)
                            .await
                            .context(format!("upsert user {}", user.user_id))?;
                    }

                    s.get_team(&name).await.context("get created team")
                }
                .boxed()
            }),
        )
        .await?;

        tracing::info!(
            team = %team.team_name,
            members = team.members.len(),
            "Team created"
        );
        Ok(team)
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team> {
        require(team_name, "team_name")?;

        let name = team_name.to_string();
        with_deadline(
            self.timeout,
            run(&self.uow, move |s| async move { s.get_team(&name).await }.boxed()),
        )
        .await
    }

    /// Flip a user's activity flag; existing assignments are left alone
    pub async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        require(user_id, "user_id")?;

        let id = user_id.to_string();
        let user = with_deadline(
            self.timeout,
            run(&self.uow, move |s| {
                async move { s.set_user_active(&id, is_active).await }.boxed()
            }),
        )
        .await?;

        tracing::info!(user_id = %user.user_id, is_active, "User activity updated");
        Ok(user)
    }
}
