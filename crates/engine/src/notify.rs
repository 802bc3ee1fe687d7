use tokio::sync::mpsc;

/// Fired whenever a run starts, so a menu or toast can react.
#[derive(Debug, Clone)]
pub struct RunNotice {
    pub id: String,
    pub display_name: String,
}

impl RunNotice {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Notice channel sender — the engine pushes run-started notices here.
pub type NoticeSender = mpsc::Sender<RunNotice>;
/// Notice channel receiver — UI surfaces consume from here.
pub type NoticeReceiver = mpsc::Receiver<RunNotice>;

/// Create a notice channel with the given buffer size.
pub fn channel(buffer: usize) -> (NoticeSender, NoticeReceiver) {
    mpsc::channel(buffer)
}
