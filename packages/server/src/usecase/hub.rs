//! UseCase: 接続ハブ
//!
//! ハブは接続中クライアントのルーティングテーブルを唯一所有し、
//! 登録・登録解除・ブロードキャストを 1 本の制御ループで直列に処理します。
//! テーブルへの書き込みは制御ループ内でのみ行われ、他のタスクはチャンネル経由で
//! 要求を送るか、読み取り（ピア宛て配送・一覧取得）だけを行います。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 制御ループの各ハンドラ（登録・登録解除・ブロードキャスト）
//! - `serve` の受け付け処理と `run` の二重起動防止
//!
//! ### なぜこのテストが必要か
//! - ID の一意性と単調増加を保証する（切断後に ID が再利用されない）
//! - ブロードキャストが送信者自身に戻らないことを保証する
//! - 登録が完了する前のクライアントに配送されないことを確認する
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数クライアントの登録とブロードキャスト
//! - 異常系：クライアント生成の失敗、未登録 ID の登録解除
//! - エッジケース：制御ループの二重起動

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    domain::{Client, ClientError, ClientId, Packet, Payload},
    infrastructure::registry::Registry,
};

use super::error::HubError;

struct HubReceivers {
    register_rx: UnboundedReceiver<Arc<dyn Client>>,
    unregister_rx: UnboundedReceiver<ClientId>,
    broadcast_rx: UnboundedReceiver<Packet>,
}

/// Central coordinator of all connected clients
pub struct Hub {
    /// Routing table, written only by the control loop
    clients: Registry<Arc<dyn Client>>,
    /// Clients in this channel will be registered with the hub
    register_tx: UnboundedSender<Arc<dyn Client>>,
    /// Clients in this channel will be unregistered from the hub
    unregister_tx: UnboundedSender<ClientId>,
    /// Packets in this channel are processed by every client except the sender
    broadcast_tx: UnboundedSender<Packet>,
    /// Taken by `run`; `None` once the control loop has started
    receivers: Mutex<Option<HubReceivers>>,
}

impl Hub {
    /// Create a new idle hub
    pub fn new() -> Self {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

        Self {
            clients: Registry::new(),
            register_tx,
            unregister_tx,
            broadcast_tx,
            receivers: Mutex::new(Some(HubReceivers {
                register_rx,
                unregister_rx,
                broadcast_rx,
            })),
        }
    }

    /// Run the control loop.
    ///
    /// Serves the three channels fairly until every sender is gone, which in
    /// practice means for the lifetime of the process.
    ///
    /// # Errors
    ///
    /// Returns `HubError::AlreadyRunning` if the loop was started before
    pub async fn run(&self) -> Result<(), HubError> {
        let HubReceivers {
            mut register_rx,
            mut unregister_rx,
            mut broadcast_rx,
        } = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HubError::AlreadyRunning)?;

        tracing::info!("Awaiting client registrations");

        loop {
            tokio::select! {
                Some(client) = register_rx.recv() => self.handle_register(client),
                Some(client_id) = unregister_rx.recv() => self.handle_unregister(client_id),
                Some(packet) = broadcast_rx.recv() => self.handle_broadcast(packet),
                else => break,
            }
        }

        tracing::info!("Hub control loop stopped");
        Ok(())
    }

    /// Create a client for a new connection and start its pumps.
    ///
    /// Returns as soon as the client is queued for registration and both pump
    /// tasks are spawned. A factory failure is logged and the connection is
    /// dropped without ever reaching the routing table.
    ///
    /// Must be called from within a tokio runtime.
    pub fn serve<C, F>(self: &Arc<Self>, factory: F, connection: C)
    where
        F: FnOnce(Arc<Hub>, C) -> Result<Arc<dyn Client>, ClientError>,
    {
        let client = match factory(Arc::clone(self), connection) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Error obtaining client for new connection: {}", e);
                return;
            }
        };

        self.register(Arc::clone(&client));

        let writer = Arc::clone(&client);
        tokio::spawn(async move { writer.write_pump().await });
        tokio::spawn(async move { client.read_pump().await });
    }

    /// Queue a client for registration
    pub fn register(&self, client: Arc<dyn Client>) {
        if self.register_tx.send(client).is_err() {
            tracing::warn!("Hub is not running; registration dropped");
        }
    }

    /// Queue a client for removal from the routing table
    pub fn unregister(&self, client_id: ClientId) {
        if self.unregister_tx.send(client_id).is_err() {
            tracing::warn!("Hub is not running; unregistration of {} dropped", client_id);
        }
    }

    /// Queue a packet for every client except its sender
    pub fn broadcast(&self, packet: Packet) {
        if self.broadcast_tx.send(packet).is_err() {
            tracing::warn!("Hub is not running; broadcast dropped");
        }
    }

    /// Deliver a payload to exactly one client, on the caller's task.
    ///
    /// Returns `false` when no client is registered under `peer_id`.
    pub fn deliver_to(&self, peer_id: ClientId, sender_id: ClientId, payload: Payload) -> bool {
        match self.client(peer_id) {
            Some(peer) => {
                peer.process_message(sender_id, payload);
                true
            }
            None => false,
        }
    }

    /// Look up a registered client
    pub fn client(&self, client_id: ClientId) -> Option<Arc<dyn Client>> {
        self.clients.get(client_id.value())
    }

    /// Approximate number of registered clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Identities of all registered clients, ascending
    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids = Vec::with_capacity(self.clients.len());
        self.clients.for_each(|id, _| ids.push(ClientId::new(id)));
        ids.sort();
        ids
    }

    fn handle_register(&self, client: Arc<dyn Client>) {
        // The registry counter never goes backwards, so identities are not
        // reused after a client leaves.
        let client_id = ClientId::new(self.clients.add(Arc::clone(&client)));
        // Until `initialize` returns, `deliver_to` can already reach this
        // client by id. Broadcasts cannot, since they run on this loop.
        client.initialize(client_id);
        tracing::info!(
            "Client {} registered (total: {})",
            client_id,
            self.clients.len()
        );
    }

    fn handle_unregister(&self, client_id: ClientId) {
        match self.clients.remove(client_id.value()) {
            Some(_) => tracing::info!(
                "Client {} unregistered (total: {})",
                client_id,
                self.clients.len()
            ),
            None => tracing::debug!("Ignoring unregistration of unknown client {}", client_id),
        }
    }

    fn handle_broadcast(&self, packet: Packet) {
        let Packet { sender_id, payload } = packet;
        tracing::debug!("Broadcasting {} from {}", payload.kind(), sender_id);

        self.clients.for_each(|id, client| {
            if id != sender_id.value() {
                client.process_message(sender_id, payload.clone());
            }
        });
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::MockClient;
    use mockall::predicate::eq;
    use std::time::Duration;

    fn mock_registered_as(id: u64) -> MockClient {
        let mut client = MockClient::new();
        client
            .expect_initialize()
            .with(eq(ClientId::new(id)))
            .times(1)
            .return_const(());
        client
    }

    async fn wait_for_count(hub: &Hub, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.client_count() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("client count did not settle");
    }

    #[test]
    fn test_register_assigns_sequential_ids_from_one() {
        // テスト項目: 登録順に 1 から ID が割り当てられ、initialize が呼ばれる
        // given (前提条件):
        let hub = Hub::new();

        // when (操作):
        hub.handle_register(Arc::new(mock_registered_as(1)));
        hub.handle_register(Arc::new(mock_registered_as(2)));
        hub.handle_register(Arc::new(mock_registered_as(3)));

        // then (期待する結果):
        assert_eq!(hub.client_count(), 3);
        assert_eq!(
            hub.client_ids(),
            vec![ClientId::new(1), ClientId::new(2), ClientId::new(3)]
        );
    }

    #[test]
    fn test_identity_not_reused_after_unregister() {
        // テスト項目: A(ID 1) が登録解除された後に登録した B は ID 2 を受け取る
        // given (前提条件):
        let hub = Hub::new();
        hub.handle_register(Arc::new(mock_registered_as(1)));

        // when (操作):
        hub.handle_unregister(ClientId::new(1));
        hub.handle_register(Arc::new(mock_registered_as(2)));

        // then (期待する結果):
        assert_eq!(hub.client_ids(), vec![ClientId::new(2)]);
        assert!(hub.client(ClientId::new(1)).is_none());
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        // テスト項目: 送信者以外の全クライアントだけが process_message を受け取る
        // given (前提条件):
        let hub = Hub::new();
        let payload = Payload::chat("hello");

        let mut a = mock_registered_as(1);
        a.expect_process_message().never();

        let mut b = mock_registered_as(2);
        b.expect_process_message()
            .with(eq(ClientId::new(1)), eq(payload.clone()))
            .times(1)
            .return_const(());

        let mut c = mock_registered_as(3);
        c.expect_process_message()
            .with(eq(ClientId::new(1)), eq(payload.clone()))
            .times(1)
            .return_const(());

        hub.handle_register(Arc::new(a));
        hub.handle_register(Arc::new(b));
        hub.handle_register(Arc::new(c));

        // when (操作):
        hub.handle_broadcast(Packet::new(ClientId::new(1), payload));

        // then (期待する結果): hub を破棄するとモックの呼び出し回数が検証される
        drop(hub);
    }

    #[test]
    fn test_system_broadcast_reaches_everyone() {
        // テスト項目: システム送信者 (ID 0) のブロードキャストは全員に届く
        // given (前提条件):
        let hub = Hub::new();
        for id in 1..=2 {
            let mut client = mock_registered_as(id);
            client
                .expect_process_message()
                .with(eq(ClientId::SYSTEM), eq(Payload::chat("maintenance")))
                .times(1)
                .return_const(());
            hub.handle_register(Arc::new(client));
        }

        // when (操作):
        hub.handle_broadcast(Packet::new(ClientId::SYSTEM, Payload::chat("maintenance")));

        // then (期待する結果):
        drop(hub);
    }

    #[test]
    fn test_unregistered_client_gets_no_broadcast() {
        // テスト項目: 登録解除されたクライアントにはブロードキャストが届かない
        // given (前提条件):
        let hub = Hub::new();
        let mut client = mock_registered_as(1);
        client.expect_process_message().never();
        hub.handle_register(Arc::new(client));

        // when (操作):
        hub.handle_unregister(ClientId::new(1));
        hub.handle_broadcast(Packet::new(ClientId::new(99), Payload::chat("hi")));

        // then (期待する結果):
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_unregister_unknown_client_is_ignored() {
        // テスト項目: 未登録 ID の登録解除は何もしない
        // given (前提条件):
        let hub = Hub::new();
        hub.handle_register(Arc::new(mock_registered_as(1)));

        // when (操作):
        hub.handle_unregister(ClientId::new(42));

        // then (期待する結果):
        assert_eq!(hub.client_count(), 1);
    }

    #[test]
    fn test_deliver_to_peer() {
        // テスト項目: ピア宛て配送は宛先 1 件だけに送信者 ID 付きで届く
        // given (前提条件):
        let hub = Hub::new();
        let mut peer = mock_registered_as(1);
        peer.expect_process_message()
            .with(eq(ClientId::new(7)), eq(Payload::chat("psst")))
            .times(1)
            .return_const(());
        hub.handle_register(Arc::new(peer));

        // when (操作):
        let delivered = hub.deliver_to(ClientId::new(1), ClientId::new(7), Payload::chat("psst"));
        let missing = hub.deliver_to(ClientId::new(2), ClientId::new(7), Payload::chat("psst"));

        // then (期待する結果):
        assert!(delivered);
        assert!(!missing);
        drop(hub);
    }

    #[tokio::test]
    async fn test_run_twice_fails() {
        // テスト項目: 制御ループは 1 度しか起動できない
        // given (前提条件): 1 回目の run は動き続けるのでタイムアウトで打ち切る
        let hub = Hub::new();
        let first = tokio::time::timeout(Duration::from_millis(20), hub.run()).await;

        // when (操作):
        let second = hub.run().await;

        // then (期待する結果):
        assert!(first.is_err());
        assert_eq!(second, Err(HubError::AlreadyRunning));
    }

    #[tokio::test]
    async fn test_registration_completes_before_delivery() {
        // テスト項目: initialize が完了するまでブロードキャストは届かない
        // given (前提条件):
        let hub = Arc::new(Hub::new());
        let runner = Arc::clone(&hub);
        tokio::spawn(async move { runner.run().await });

        let events = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut client = MockClient::new();
        let init_events = Arc::clone(&events);
        client.expect_initialize().returning(move |id| {
            init_events.lock().unwrap().push(format!("initialize {id}"));
        });
        let msg_events = Arc::clone(&events);
        client.expect_process_message().returning(move |sender, _| {
            msg_events.lock().unwrap().push(format!("process from {sender}"));
            let _ = tx.send(());
        });

        // when (操作):
        hub.register(Arc::new(client));
        wait_for_count(&hub, 1).await;
        hub.broadcast(Packet::new(ClientId::new(5), Payload::chat("hi")));
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("broadcast was not delivered");

        // then (期待する結果):
        assert_eq!(
            *events.lock().unwrap(),
            vec!["initialize 1".to_string(), "process from 5".to_string()]
        );
    }

    #[tokio::test]
    async fn test_serve_failed_factory_registers_nothing() {
        // テスト項目: クライアント生成に失敗した接続はハブに登録されない
        // given (前提条件):
        let hub = Arc::new(Hub::new());
        let runner = Arc::clone(&hub);
        tokio::spawn(async move { runner.run().await });

        // when (操作):
        hub.serve(
            |_, capacity: usize| {
                Err(ClientError::CapacityExceeded {
                    capacity,
                    current: capacity,
                })
            },
            0,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        // then (期待する結果):
        assert_eq!(hub.client_count(), 0);
    }
}
