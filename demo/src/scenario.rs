//! The editorial lifecycle walked through by `demo run`.
//!
//! An editor signs in, creates an article, edits it twice (once without
//! changing anything), publishes it, signs out, and a background job then
//! deletes it. Every step goes through the `HookDispatcher` the way model
//! hooks would.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use uuid::Uuid;

use actlog_contracts::{
    action::Action,
    error::ActivityResult,
    record::{ActivityEntry, PrincipalId},
};
use actlog_core::{
    traits::{Auditable, PrincipalResolver},
    HookDispatcher,
};

use crate::report;

/// The entity under audit.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub published: bool,
}

impl Auditable for Article {
    const SUBJECT_TYPE: &'static str = "articles";

    fn subject_id(&self) -> String {
        self.id.to_string()
    }
}

/// Who is signed in. Clones share the same session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<Mutex<Option<PrincipalId>>>,
}

impl Session {
    pub fn sign_in(&self, principal_id: PrincipalId) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(principal_id);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    pub fn current(&self) -> Option<PrincipalId> {
        self.current.lock().ok().and_then(|current| *current)
    }

    /// A resolver reading this session.
    pub fn resolver(&self) -> Box<dyn PrincipalResolver> {
        let session = self.clone();
        Box::new(move || session.current())
    }
}

/// Run the lifecycle and return the article's history.
pub fn run_scenario(hooks: &HookDispatcher, session: &Session) -> ActivityResult<Vec<ActivityEntry>> {
    let editor = PrincipalId(7);

    println!("  [1] editor {} signs in and creates an article", editor);
    session.sign_in(editor);
    let draft = Article {
        id: Uuid::new_v4(),
        title: "Quarterly report".to_string(),
        body: "Draft".to_string(),
        published: false,
    };
    report::outcome(hooks.on_created(&draft)?);

    println!("  [2] editor rewrites the body");
    let mut edited = draft.clone();
    edited.body = "Revenue grew in every region.".to_string();
    report::outcome(hooks.on_before_update_from(&draft, &edited)?);

    println!("  [3] editor saves without changes");
    report::outcome(hooks.on_before_update_from(&edited, &edited)?);

    println!("  [4] editor publishes the article");
    let mut published = edited.clone();
    published.published = true;
    report::outcome(Some(hooks.logger().log_for(
        &published,
        Action::Custom("publish".to_string()),
        None,
    )?));

    println!("  [5] editor signs out; a cleanup job deletes the article");
    session.sign_out();
    report::outcome(hooks.on_deleted(&published)?);

    println!();
    hooks.logger().activity_of(&draft)
}
