//! Saving and restoring a session through the sled store.
mod common;

use common::{run, session, start_time};
use ncterm::engine::{Content, EngineError, GameSession, GameStoreBuilder};
use tempfile::TempDir;

#[tokio::test]
async fn state_survives_a_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let (mut s, _clock) = session();
    for input in ["pwd", "ls", "nc-clock-in", "nc-complete-task 2", "rm -rf /"] {
        run(&mut s, input).await;
    }

    {
        let store = GameStoreBuilder::new(dir.path()).open().unwrap();
        for attempt in s.drain_danger_attempts() {
            store.append_danger("recruit", &attempt).unwrap();
        }
        store.save_player(s.state()).unwrap();
        store.flush().unwrap();
    }

    let store = GameStoreBuilder::new(dir.path()).open().unwrap();
    let restored = store
        .load_player("recruit", "ignored", start_time())
        .unwrap();
    assert_eq!(&restored, s.state());
    assert_eq!(restored.player.display_name, "New Recruit");
    assert_eq!(store.danger_log("recruit").unwrap().len(), 1);
    assert_eq!(store.list_player_ids().unwrap(), vec!["recruit".to_string()]);

    // A resumed session picks up where the old one stopped.
    let mut resumed = GameSession::new(restored, Content::builtin());
    assert_eq!(resumed.state().current_quest_index, s.state().current_quest_index);
    let out = run(&mut resumed, "whoami").await;
    assert_eq!(
        out.quest_completed.map(|q| q.quest_id),
        Some("identity".to_string())
    );
}

#[test]
fn a_held_store_refuses_a_second_writer() {
    let dir = TempDir::new().unwrap();
    let _writer = GameStoreBuilder::new(dir.path()).open().unwrap();
    assert!(matches!(
        GameStoreBuilder::new(dir.path()).open(),
        Err(EngineError::Locked(_))
    ));
}
