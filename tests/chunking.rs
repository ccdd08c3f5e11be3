//! Property-based checks that dispatch is independent of input slicing.
//!
//! Random conversations are rendered through the real send path, then fed
//! back through `input` both in one call and cut at arbitrary byte
//! boundaries; the dispatched event sequence must be identical.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use proptest::prelude::*;
use syncwire::{FramingError, OutputQueue, ProtocolHandler, ProtocolState, RawCoder};

#[derive(Debug, Clone)]
enum Item {
    Plain(Vec<u8>),
    Signed(Vec<u8>, Vec<u8>),
    WithPayload(Vec<u8>, Vec<Vec<u8>>),
}

#[derive(Clone, Debug, PartialEq)]
enum Event {
    Message(Vec<u8>, Option<Vec<u8>>),
    Payload(Vec<u8>),
    PayloadEnd,
    Garbage,
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl ProtocolHandler<RawCoder> for Recorder {
    fn handle_message(
        &mut self,
        _out: &mut OutputQueue<RawCoder>,
        message: Vec<u8>,
        signature: Option<Bytes>,
    ) {
        self.events
            .push(Event::Message(message, signature.map(|sig| sig.to_vec())));
    }

    fn handle_payload(&mut self, _out: &mut OutputQueue<RawCoder>, data: Bytes) {
        self.events.push(Event::Payload(data.to_vec()));
    }

    fn handle_payload_end(&mut self, _out: &mut OutputQueue<RawCoder>) {
        self.events.push(Event::PayloadEnd);
    }

    fn handle_msg_garbage(
        &mut self,
        _out: &mut OutputQueue<RawCoder>,
        _error: &FramingError,
        _buff: &[u8],
    ) {
        self.events.push(Event::Garbage);
    }

    fn handle_pl_garbage(
        &mut self,
        _out: &mut OutputQueue<RawCoder>,
        _error: &FramingError,
        _buff: &[u8],
    ) {
        self.events.push(Event::Garbage);
    }
}

struct Discard;

impl ProtocolHandler<RawCoder> for Discard {
    fn handle_message(
        &mut self,
        _out: &mut OutputQueue<RawCoder>,
        _message: Vec<u8>,
        _signature: Option<Bytes>,
    ) {
    }

    fn handle_payload(&mut self, _out: &mut OutputQueue<RawCoder>, _data: Bytes) {}

    fn handle_payload_end(&mut self, _out: &mut OutputQueue<RawCoder>) {}
}

/// Render `items` to wire bytes through the real send path.
fn render(items: &[Item]) -> Vec<u8> {
    let written: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
    let sink = Arc::clone(&written);
    let mut sender = ProtocolState::new(RawCoder, Discard);
    sender.set_write_fn(move |buff| {
        sink.lock()
            .expect("sink lock should not be poisoned")
            .push(buff.to_vec());
    });

    for item in items {
        match item {
            Item::Plain(body) => sender.send_message(body).expect("message should queue"),
            Item::Signed(body, sig) => sender
                .send_message_with(body, false, Some(sig))
                .expect("message should queue"),
            Item::WithPayload(body, chunks) => {
                sender
                    .send_message_with(body, true, None)
                    .expect("message should queue");
                for chunk in chunks {
                    sender.send_payload_chunk(chunk).expect("chunk should queue");
                }
                sender.send_payload_end();
            }
        }
    }
    while !sender.output().is_empty() {
        sender.on_write_finished();
    }

    written
        .lock()
        .expect("sink lock should not be poisoned")
        .concat()
}

fn expected(items: &[Item]) -> Vec<Event> {
    let mut events = Vec::new();
    for item in items {
        match item {
            Item::Plain(body) => events.push(Event::Message(body.clone(), None)),
            Item::Signed(body, sig) => {
                events.push(Event::Message(body.clone(), Some(sig.clone())));
            }
            Item::WithPayload(body, chunks) => {
                events.push(Event::Message(body.clone(), None));
                for chunk in chunks {
                    events.push(Event::Payload(chunk.clone()));
                }
                events.push(Event::PayloadEnd);
            }
        }
    }
    events
}

fn body_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..48)
}

fn signature_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 1..16)
}

fn chunks_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..32), 0..4)
}

fn item_strategy() -> impl Strategy<Value = Item> {
    prop_oneof![
        body_strategy().prop_map(Item::Plain),
        (body_strategy(), signature_strategy()).prop_map(|(body, sig)| Item::Signed(body, sig)),
        (body_strategy(), chunks_strategy())
            .prop_map(|(body, chunks)| Item::WithPayload(body, chunks)),
    ]
}

proptest! {
    #[test]
    fn dispatch_matches_for_any_slicing(
        items in proptest::collection::vec(item_strategy(), 1..5),
        cuts in proptest::collection::vec(any::<proptest::sample::Index>(), 0..6),
    ) {
        let wire = render(&items);
        let want = expected(&items);

        let mut whole = ProtocolState::new(RawCoder, Recorder::default());
        whole.input(&wire);
        prop_assert_eq!(whole.handler().events.clone(), want.clone());
        prop_assert_eq!(whole.input_buffered(), 0);

        let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(wire.len() + 1)).collect();
        points.sort_unstable();

        let mut sliced = ProtocolState::new(RawCoder, Recorder::default());
        let mut start = 0;
        for point in points {
            sliced.input(&wire[start..point]);
            start = point;
        }
        sliced.input(&wire[start..]);

        prop_assert_eq!(sliced.handler().events.clone(), want);
        prop_assert_eq!(sliced.input_buffered(), 0);
    }
}
