use serde::Serialize;

/// Success payload for a session submission.
#[derive(Serialize)]
pub struct LoggedOut {
    pub logged: u32,
}
