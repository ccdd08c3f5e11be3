use std::sync::{Arc, Mutex};

use super::{OutputQueue, SendError};
use crate::{coder::RawCoder, config::ProtocolConfig};

fn raw_queue() -> OutputQueue<RawCoder> {
    OutputQueue::new(RawCoder, ProtocolConfig::default())
}

/// Queue limits are used as given here; clamping happens at state level.
fn tight() -> ProtocolConfig {
    ProtocolConfig {
        max_preamble: 8,
        max_signature: 4,
        max_message: 8,
        max_payload_chunk: 4,
        initial_buffer_capacity: 64,
    }
}

fn capture(queue: &mut OutputQueue<RawCoder>) -> Arc<Mutex<Vec<Vec<u8>>>> {
    let written: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
    let sink = Arc::clone(&written);
    queue.set_write_fn(move |buff| {
        sink.lock()
            .expect("sink lock should not be poisoned")
            .push(buff.to_vec());
    });
    written
}

fn written_so_far(written: &Arc<Mutex<Vec<Vec<u8>>>>) -> Vec<Vec<u8>> {
    written
        .lock()
        .expect("sink lock should not be poisoned")
        .clone()
}

#[test]
fn queued_buffers_are_written_one_at_a_time_in_order() {
    let mut queue = raw_queue();
    let written = capture(&mut queue);

    queue.send_message(&b"one".to_vec()).expect("message should queue");
    queue.send_message(&b"two".to_vec()).expect("message should queue");
    queue.send_message(&b"three".to_vec()).expect("message should queue");

    assert_eq!(written_so_far(&written), vec![b"m3\none\n".to_vec()]);
    assert!(queue.write_in_progress());
    assert_eq!(queue.len(), 3);

    assert!(queue.finish_write());
    queue.write_next_buff();
    assert_eq!(
        written_so_far(&written),
        vec![b"m3\none\n".to_vec(), b"m3\ntwo\n".to_vec()]
    );

    assert!(queue.finish_write());
    queue.write_next_buff();
    assert_eq!(
        written_so_far(&written),
        vec![
            b"m3\none\n".to_vec(),
            b"m3\ntwo\n".to_vec(),
            b"m5\nthree\n".to_vec(),
        ]
    );

    assert!(queue.finish_write());
    assert!(queue.is_empty());
    assert!(!queue.write_in_progress());
}

#[test]
fn front_buffer_stays_queued_until_completion_is_acknowledged() {
    let mut queue = raw_queue();
    let written = capture(&mut queue);

    queue.send_message(&b"hold".to_vec()).expect("message should queue");
    assert_eq!(queue.len(), 1);
    assert!(queue.write_in_progress());

    queue.write_next_buff();
    assert_eq!(written_so_far(&written).len(), 1);
    assert_eq!(queue.len(), 1);
}

#[test]
fn completion_with_nothing_in_flight_is_rejected() {
    let mut queue = raw_queue();
    assert!(!queue.finish_write());

    let _written = capture(&mut queue);
    queue.send_message(&b"one".to_vec()).expect("message should queue");
    assert!(queue.finish_write());
    assert!(!queue.finish_write());
}

#[test]
fn buffers_accumulate_until_a_write_fn_is_installed() {
    let mut queue = raw_queue();
    queue.send_message(&b"early".to_vec()).expect("message should queue");
    assert_eq!(queue.len(), 1);
    assert!(!queue.write_in_progress());

    let written = capture(&mut queue);
    queue.write_next_buff();
    assert_eq!(written_so_far(&written), vec![b"m5\nearly\n".to_vec()]);
}

#[test]
fn signed_payload_message_frames_signature_and_marker() {
    let mut queue = raw_queue();
    let written = capture(&mut queue);

    queue
        .send_message_with(&b"hello".to_vec(), true, Some(b"SIG"))
        .expect("message should queue");
    assert_eq!(written_so_far(&written), vec![b"$5\n3\nSIGhello\n".to_vec()]);
}

#[test]
fn payload_end_queues_the_sentinel_chunk() {
    let mut queue = raw_queue();
    let written = capture(&mut queue);

    queue.send_payload_end();
    assert_eq!(written_so_far(&written), vec![b"0\n".to_vec()]);
}

#[test]
fn empty_chunk_queues_the_sentinel_chunk() {
    let mut queue = raw_queue();
    let written = capture(&mut queue);

    queue.send_payload_chunk(&[]).expect("sentinel should queue");
    assert_eq!(written_so_far(&written), vec![b"0\n".to_vec()]);
}

#[test]
fn oversized_message_is_rejected_before_queueing() {
    let mut queue = OutputQueue::new(RawCoder, tight());
    let error = queue
        .send_message(&vec![b'x'; 9])
        .expect_err("oversized message should be rejected");

    assert!(matches!(error, SendError::MessageTooLarge { size: 9, max: 8 }));
    assert!(queue.is_empty());
}

#[test]
fn oversized_chunk_is_rejected_before_queueing() {
    let mut queue = OutputQueue::new(RawCoder, tight());
    let error = queue
        .send_payload_chunk(&[b'x'; 5])
        .expect_err("oversized chunk should be rejected");

    assert!(matches!(error, SendError::ChunkTooLarge { size: 5, max: 4 }));
    assert!(queue.is_empty());
}

#[test]
fn empty_signature_is_rejected() {
    let mut queue = OutputQueue::new(RawCoder, tight());
    let error = queue
        .send_message_with(&b"hi".to_vec(), false, Some(b""))
        .expect_err("empty signature should be rejected");

    assert!(matches!(error, SendError::EmptySignature));
    assert!(queue.is_empty());
}

#[test]
fn oversized_signature_is_rejected() {
    let mut queue = OutputQueue::new(RawCoder, tight());
    let error = queue
        .send_message_with(&b"hi".to_vec(), false, Some(b"12345"))
        .expect_err("oversized signature should be rejected");

    assert!(matches!(error, SendError::SignatureTooLarge { size: 5, max: 4 }));
    assert!(queue.is_empty());
}
