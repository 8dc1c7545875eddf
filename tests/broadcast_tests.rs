use anyhow::{anyhow, Result};
use async_trait::async_trait;
use king_says_bot::bot::transport::Transport;
use king_says_bot::database::{connection::DatabaseManager, GameStore};
use king_says_bot::game::{CommandBroadcaster, Gender, PlaceholderConfig, PlaceholderKind, PlaceholderMatcher};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

/// Remembers every sent message; chats listed in `failing` reject delivery.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(i64, String)>>,
    failing: Vec<i64>,
}

impl RecordingTransport {
    fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, chat_id: i64, text: &str, _replace_message_id: Option<i32>) -> Result<i32> {
        if self.failing.contains(&chat_id) {
            return Err(anyhow!("chat {chat_id} blocked the bot"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string()));
        Ok(sent.len() as i32)
    }
}

/// Moves a player into another session as soon as the first chat message
/// goes out, like a player switching games mid-round.
struct SwitchingTransport {
    store: Mutex<Option<GameStore>>,
    player: i64,
    target_session: i64,
}

#[async_trait]
impl Transport for SwitchingTransport {
    async fn send_message(&self, _chat_id: i64, _text: &str, _replace_message_id: Option<i32>) -> Result<i32> {
        let store = self.store.lock().unwrap().take();
        if let Some(store) = store {
            store.join_session(self.player, self.target_session).await?;
        }
        Ok(1)
    }
}

fn placeholders() -> PlaceholderConfig {
    PlaceholderConfig {
        female: vec!["{f}".to_string()],
        male: vec!["{m}".to_string()],
        common: vec!["{p}".to_string()],
        opposite: ["{x}".to_string(), "{y}".to_string()],
    }
}

async fn setup(transport: Arc<RecordingTransport>) -> Result<(CommandBroadcaster, TempDir)> {
    let temp_dir = tempdir()?;
    let database_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    let matcher = Arc::new(PlaceholderMatcher::new(&placeholders())?);
    let broadcaster = CommandBroadcaster::new(GameStore::new(&db_manager), matcher, transport, 10);
    Ok((broadcaster, temp_dir))
}

async fn chat_player(store: &GameStore, chat_id: i64, name: &str, gender: Gender) -> Result<i64> {
    let user_id = store.get_or_create_telegram_user(chat_id, "en", name).await?;
    store.set_user_gender(user_id, gender).await?;
    Ok(user_id)
}

#[tokio::test]
async fn test_broadcast_fills_gendered_slots() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (broadcaster, _temp_dir) = setup(transport.clone()).await?;
    let store = broadcaster.store();

    let anna = chat_player(store, 1, "Anna", Gender::FEMALE).await?;
    let bob = chat_player(store, 2, "Bob", Gender::MALE).await?;
    let session_id = store.create_session(anna).await?.session_id;
    store.join_session(bob, session_id).await?;

    let report = broadcaster.broadcast(session_id, "{f} gives {m} a <b>high five</b>").await?;

    assert_eq!(report.text, "<b>Anna</b> gives <b>Bob</b> a high five");
    assert_eq!(report.delivered, 2);
    assert!(report.idle.is_empty());
    assert_eq!(transport.sent_to(1), vec![report.text.clone()]);
    assert_eq!(transport.sent_to(2), vec![report.text.clone()]);

    assert_eq!(store.idle_count(anna).await?, Some(0));
    assert_eq!(store.idle_count(bob).await?, Some(0));
    Ok(())
}

#[tokio::test]
async fn test_broadcast_updates_idle_counts() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (broadcaster, _temp_dir) = setup(transport.clone()).await?;
    let store = broadcaster.store();

    let anna = chat_player(store, 1, "Anna", Gender::FEMALE).await?;
    let session_id = store.create_session(anna).await?.session_id;
    store.add_web_participant(session_id, 900, "Webby", Gender::MALE).await?;
    let webby = store.web_user_id(900).await?.expect("web user missing");

    // only a female slot, so the web player sits out every round
    for round in 1..=3 {
        let report = broadcaster.broadcast(session_id, "{f} claps").await?;
        assert_eq!(report.participated, vec![anna]);
        assert_eq!(report.idle, vec![webby]);
        assert_eq!(store.idle_count(webby).await?, Some(round));
        assert_eq!(store.idle_count(anna).await?, Some(0));
    }

    let poll = store.poll_new_messages(webby, 0).await?;
    assert_eq!(poll.messages.len(), 3);
    assert!(poll.messages.iter().all(|text| text == "<b>Anna</b> claps"));

    // once picked, the idle count starts over
    broadcaster.broadcast(session_id, "{m} bows").await?;
    assert_eq!(store.idle_count(webby).await?, Some(0));
    assert_eq!(store.idle_count(anna).await?, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_broadcast_survives_failed_delivery() -> Result<()> {
    let transport = Arc::new(RecordingTransport {
        failing: vec![2],
        ..Default::default()
    });
    let (broadcaster, _temp_dir) = setup(transport.clone()).await?;
    let store = broadcaster.store();

    let anna = chat_player(store, 1, "Anna", Gender::FEMALE).await?;
    let bob = chat_player(store, 2, "Bob", Gender::MALE).await?;
    let session_id = store.create_session(anna).await?.session_id;
    store.join_session(bob, session_id).await?;

    let report = broadcaster.broadcast(session_id, "{m} sings").await?;
    assert_eq!(report.delivered, 1);
    assert_eq!(report.participated, vec![bob]);
    assert_eq!(transport.sent_to(1), vec!["<b>Bob</b> sings".to_string()]);
    assert!(transport.sent_to(2).is_empty());
    assert_eq!(store.idle_count(anna).await?, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_reveal_suggestion() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (broadcaster, _temp_dir) = setup(transport.clone()).await?;
    let store = broadcaster.store();

    let anna = chat_player(store, 1, "Anna", Gender::FEMALE).await?;
    let session_id = store.create_session(anna).await?.session_id;

    assert!(broadcaster.reveal_suggestion(session_id).await?.is_none());

    store.enqueue_suggestion(session_id, "{p} tells a joke").await?;
    let report = broadcaster
        .reveal_suggestion(session_id)
        .await?
        .expect("suggestion was queued");
    assert_eq!(report.text, "<b>Anna</b> tells a joke");
    assert_eq!(store.suggestion_count(session_id).await?, 0);
    assert!(broadcaster.reveal_suggestion(session_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_give_numbers() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (broadcaster, _temp_dir) = setup(transport.clone()).await?;
    let store = broadcaster.store();

    let anna = chat_player(store, 1, "Anna", Gender::FEMALE).await?;
    let bob = chat_player(store, 2, "Bob", Gender::MALE).await?;
    let cleo = chat_player(store, 3, "Cleo", Gender::NONE).await?;
    let session_id = store.create_session(anna).await?.session_id;
    store.join_session(bob, session_id).await?;
    store.join_session(cleo, session_id).await?;

    assert_eq!(broadcaster.give_numbers(session_id).await?, 2);

    let anna_messages = transport.sent_to(1);
    assert_eq!(anna_messages.len(), 1);
    assert!(anna_messages[0].contains("Female number: <b>1</b>"));

    let bob_messages = transport.sent_to(2);
    assert_eq!(bob_messages.len(), 1);
    assert!(bob_messages[0].contains("Male number: <b>1</b>"));

    assert!(transport.sent_to(3).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_preview_labels_placeholders() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (broadcaster, _temp_dir) = setup(transport).await?;

    let preview = broadcaster.preview("{f} and {p} hug", |kind| match kind {
        PlaceholderKind::Female => "girl".to_string(),
        PlaceholderKind::Male => "boy".to_string(),
        PlaceholderKind::Any => "anyone".to_string(),
    });

    assert!(preview.contains("girl"), "{preview}");
    assert!(preview.contains("anyone"), "{preview}");
    assert!(preview.ends_with(" hug"), "{preview}");
    Ok(())
}

#[tokio::test]
async fn test_player_switching_session_mid_broadcast_keeps_fresh_idle_count() -> Result<()> {
    let recorder = Arc::new(RecordingTransport::default());
    let (setup_broadcaster, _temp_dir) = setup(recorder).await?;
    let store = setup_broadcaster.store().clone();

    let anna = chat_player(&store, 1, "Anna", Gender::FEMALE).await?;
    let bob = chat_player(&store, 2, "Bob", Gender::MALE).await?;
    let cleo = chat_player(&store, 3, "Cleo", Gender::MALE).await?;
    let first = store.create_session(anna).await?.session_id;
    store.join_session(bob, first).await?;
    let second = store.create_session(cleo).await?.session_id;

    let transport = Arc::new(SwitchingTransport {
        store: Mutex::new(Some(store.clone())),
        player: bob,
        target_session: second,
    });
    let matcher = Arc::new(PlaceholderMatcher::new(&placeholders())?);
    let broadcaster = CommandBroadcaster::new(store.clone(), matcher, transport, 10);

    // Bob is not picked for the female slot, so he would be counted idle
    let report = broadcaster.broadcast(first, "{f} waves").await?;
    assert_eq!(report.idle, vec![bob]);

    assert_eq!(store.user_session(bob).await?, Some(second));
    assert_eq!(store.idle_count(bob).await?, Some(0));
    assert_eq!(store.idle_count(anna).await?, Some(0));
    Ok(())
}
