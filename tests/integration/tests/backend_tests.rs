//! REST contract tests
//!
//! Drive `HttpBackend` against the in-process backend.

use integration_tests::{at, photo, unique_item, TestServer, ALICE, BOB};
use mememori_core::traits::ChatBackend;
use mememori_core::{AttachmentKind, MessageId, NewMessage, PendingFile, ReactionInput, ReactionType};

#[tokio::test]
async fn test_thread_lookup_and_creation() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let item = unique_item();

    assert_eq!(backend.find_thread_by_item(&item).await.unwrap(), None);

    let created = backend.create_thread(&item).await.unwrap();
    assert_eq!(backend.find_thread_by_item(&item).await.unwrap(), Some(created));
    assert_eq!(server.state.hits("find_thread"), 2);
}

#[tokio::test]
async fn test_item_ids_are_path_encoded() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let item = mememori_core::ItemId::new("memes/2024 best?");

    let created = backend.create_thread(&item).await.unwrap();
    assert_eq!(backend.find_thread_by_item(&item).await.unwrap(), Some(created));
}

#[tokio::test]
async fn test_listed_messages_carry_thread_id() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let thread_id = server.state.seed_thread(&unique_item());
    server.state.seed_message(thread_id, BOB, "second", at(2024, 3, 1, 10, 0));
    server.state.seed_message(thread_id, ALICE, "first", at(2024, 3, 1, 9, 0));

    let messages = backend.list_messages(thread_id).await.unwrap();

    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert!(messages.iter().all(|m| m.thread_id == Some(thread_id)));
    assert_eq!(messages[0].username, "user1");
}

#[tokio::test]
async fn test_create_reply_message() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let thread_id = server.state.seed_thread(&unique_item());
    let parent = server.state.seed_message(thread_id, BOB, "question", at(2024, 3, 1, 9, 0));

    let reply = backend
        .create_message(&NewMessage::new(thread_id, ALICE, "answer").with_parent(Some(parent.message_id)))
        .await
        .unwrap();

    assert_eq!(reply.parent_message_id, Some(parent.message_id));
    assert_eq!(reply.thread_id, Some(thread_id));
    assert_eq!(server.state.messages_in(thread_id).len(), 2);
}

#[tokio::test]
async fn test_upload_and_list_attachments() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let thread_id = server.state.seed_thread(&unique_item());
    let message = server.state.seed_message(thread_id, ALICE, "", at(2024, 3, 1, 9, 0));

    let voice = backend
        .upload_attachment(message.message_id, &PendingFile::voice_clip(vec![1, 2, 3]))
        .await
        .unwrap();
    let image = backend.upload_attachment(message.message_id, &photo()).await.unwrap();

    assert_eq!(voice.attachment_type, AttachmentKind::Voice);
    assert!(voice.attachment_url.ends_with("/voice-message.webm"));
    assert_eq!(image.attachment_type, AttachmentKind::Image);

    let listed = backend.list_attachments(message.message_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|a| a.message_id == Some(message.message_id)));
}

#[tokio::test]
async fn test_upload_to_missing_message_is_not_found() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();

    let err = backend
        .upload_attachment(MessageId::new(999), &photo())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_reaction_upsert_batch_and_delete() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let thread_id = server.state.seed_thread(&unique_item());
    let reacted = server.state.seed_message(thread_id, BOB, "meme", at(2024, 3, 1, 9, 0));
    let quiet = server.state.seed_message(thread_id, BOB, "another", at(2024, 3, 1, 9, 1));

    for reaction_type in [ReactionType::Like, ReactionType::Heart] {
        backend
            .put_reaction(&ReactionInput {
                message_id: reacted.message_id,
                user_id: ALICE,
                reaction_type,
            })
            .await
            .unwrap();
    }
    assert_eq!(server.state.reactions_on(reacted.message_id).len(), 1);

    let batch = backend
        .reactions_for_messages(&[reacted.message_id, quiet.message_id])
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert!(batch[&quiet.message_id].is_empty());
    let reactions = &batch[&reacted.message_id];
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].reaction_type, ReactionType::Heart);
    assert_eq!(reactions[0].message_id, Some(reacted.message_id));

    backend.delete_reaction(reacted.message_id, ALICE).await.unwrap();
    assert!(server.state.reactions_on(reacted.message_id).is_empty());
}

#[tokio::test]
async fn test_delete_message_cascades() {
    let server = TestServer::start().await.unwrap();
    let backend = server.backend().unwrap();
    let thread_id = server.state.seed_thread(&unique_item());
    let message = server.state.seed_message(thread_id, ALICE, "bye", at(2024, 3, 1, 9, 0));
    backend.upload_attachment(message.message_id, &photo()).await.unwrap();
    backend
        .put_reaction(&ReactionInput {
            message_id: message.message_id,
            user_id: BOB,
            reaction_type: ReactionType::Sad,
        })
        .await
        .unwrap();

    backend.delete_message(message.message_id).await.unwrap();

    assert!(server.state.messages_in(thread_id).is_empty());
    assert!(server.state.attachments_on(message.message_id).is_empty());
    assert!(server.state.reactions_on(message.message_id).is_empty());

    let err = backend.delete_message(message.message_id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_transient());
}
