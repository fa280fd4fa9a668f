use futures_util::Stream as FutStream;
use plinko_types::{ChatMessage, PlayerView, WinFeedEntry};
use tokio::sync::mpsc;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// State pushed by the table service outside any request/reply pair.
#[derive(Debug, Clone)]
pub enum TableUpdate {
    /// Full roster and feed snapshot. The first update on a fresh
    /// connection is always the join snapshot.
    Roster {
        players: Vec<PlayerView>,
        win_feed: Vec<WinFeedEntry>,
        chat_feed: Vec<ChatMessage>,
    },
    /// A single new chat message.
    Chat(ChatMessage),
    /// Replacement chat history, sent when a moderator clears it.
    ChatFeed(Vec<ChatMessage>),
    /// The service settled a rename for this session.
    Renamed { ok: bool, name: String },
    /// This session was banned; the connection closes right after.
    Banned {
        /// Ban expiry in milliseconds since the Unix epoch.
        until: u64,
    },
    /// Out-of-band error report from the service.
    ServerError { message: String },
}

/// Stream of [`TableUpdate`]s for one connection.
///
/// Yields `None` once the connection is gone. Dropping the stream does not
/// tear down the connection; request replies keep flowing to the client.
pub struct Updates {
    receiver: mpsc::Receiver<TableUpdate>,
}

impl Updates {
    pub(crate) fn channel() -> (mpsc::Sender<TableUpdate>, Self) {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        (tx, Self { receiver: rx })
    }

    /// Receive the next update from the stream.
    pub async fn next(&mut self) -> Option<TableUpdate> {
        self.receiver.recv().await
    }
}

impl FutStream for Updates {
    type Item = TableUpdate;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
