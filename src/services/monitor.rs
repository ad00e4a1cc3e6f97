use serde::Serialize;
use tokio::sync::broadcast;

/// Лента команд, которые сервис отправляет в хранилище.
///
/// Аналог `MONITOR` в Redis, но только для команд этого процесса:
/// каждая команда уходит подписчикам JSON-массивом своих аргументов.
#[derive(Clone)]
pub struct CommandFeed {
    tx: broadcast::Sender<String>,
}

impl CommandFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish<A: Serialize + ?Sized>(&self, args: &A) {
        // Никто не слушает - не тратим время на сериализацию
        if self.tx.receiver_count() == 0 {
            return;
        }
        match serde_json::to_string(args) {
            Ok(line) => {
                let _ = self.tx.send(line);
            }
            Err(e) => tracing::warn!("Failed to serialize monitored command: {:?}", e),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}
