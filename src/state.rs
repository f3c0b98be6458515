//! Application state: who is signed in and which plan is on screen.

use serde::{Deserialize, Serialize};

use crate::models::PlanDocument;
use crate::{Result, TravelMapError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: String,
    pub username: String,
}

impl User {
    /// User known only by id; the id doubles as the display name
    #[must_use]
    pub fn from_id(user_id: String) -> Self {
        Self {
            username: user_id.clone(),
            user_id,
        }
    }
}

/// State shared by the commands of one session
#[derive(Debug, Clone, Default)]
pub struct AppState {
    current_user: Option<User>,
    current_plan: Option<PlanDocument>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, user: User) {
        self.current_user = Some(user);
    }

    /// Signing out also forgets the current plan
    pub fn logout(&mut self) {
        self.current_user = None;
        self.current_plan = None;
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// The signed-in user, or a validation error naming `action`
    pub fn require_user(&self, action: &str) -> Result<&User> {
        self.current_user
            .as_ref()
            .ok_or_else(|| TravelMapError::validation(format!("please sign in to {action}")))
    }

    pub fn set_plan(&mut self, plan: PlanDocument) {
        self.current_plan = Some(plan);
    }

    #[must_use]
    pub fn plan(&self) -> Option<&PlanDocument> {
        self.current_plan.as_ref()
    }

    pub fn take_plan(&mut self) -> Option<PlanDocument> {
        self.current_plan.take()
    }
}
