use chatbranch::storage::{MessageId, MessageStore, NewMessage, ThreadId, TokenUsage};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (MessageStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("chatbranch.db");
    let store = MessageStore::new_with_path(db_path).expect("failed to create message store");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// user -> assistant(100) -> user -> assistant(250)
#[allow(dead_code)]
pub fn seed_linear(store: &MessageStore) -> (ThreadId, Vec<MessageId>) {
    let thread = store.create_thread("linear").expect("create thread");
    let m1 = store
        .add_message(NewMessage::user(thread, "first question"))
        .expect("add m1");
    let m2 = store
        .add_message(
            NewMessage::assistant(thread, "first answer")
                .reply_to(m1)
                .with_usage(TokenUsage::with_total(100)),
        )
        .expect("add m2");
    let m3 = store
        .add_message(NewMessage::user(thread, "follow-up").reply_to(m2))
        .expect("add m3");
    let m4 = store
        .add_message(
            NewMessage::assistant(thread, "second answer")
                .reply_to(m3)
                .with_usage(TokenUsage::with_total(250)),
        )
        .expect("add m4");
    (thread, vec![m1, m2, m3, m4])
}
