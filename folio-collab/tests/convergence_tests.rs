mod common;

use common::*;
use folio_types::Version;
use pretty_assertions::assert_eq;

fn assert_converged(sim: &Sim) {
    let expected = sim.authority_json();
    for (i, client) in sim.clients.iter().enumerate() {
        assert_eq!(json_of(client), expected, "client {i} diverged");
        assert_eq!(client.version(), Some(sim.authority.version()), "client {i} version");
        assert_eq!(pending(client), 0, "client {i} still has pending steps");
    }
}

// ── Concurrent edits ─────────────────────────────────────────────

#[test]
fn concurrent_inserts_at_one_position_follow_authority_order() {
    init_tracing();
    let mut sim = Sim::new(doc("", ""), 2);
    insert(&mut sim.clients[0], 3, "a");
    insert(&mut sim.clients[1], 3, "b");

    assert!(sim.flush(0));
    assert!(!sim.flush(1), "stale batch should be refused");
    sim.settle();

    assert_converged(&sim);
    assert_eq!(text_of(&sim.clients[0]), "ab");
    assert_eq!(sim.authority.version(), Version::new(2));
}

#[test]
fn insert_and_delete_of_the_same_region_converge() {
    let mut sim = Sim::new(doc("", "hello world"), 2);
    // "hello world" spans 3..14
    delete(&mut sim.clients[0], 3, 9);
    insert(&mut sim.clients[1], 14, "!");
    insert(&mut sim.clients[1], 5, "y");

    sim.settle();
    assert_converged(&sim);
    assert_eq!(text_of(&sim.clients[1]), "world!");
}

#[test]
fn three_clients_typing_concurrently_converge() {
    let mut sim = Sim::new(doc("Notes", ""), 3);
    for (i, word) in ["one ", "two ", "three "].iter().enumerate() {
        let (start, _) = body_range(&sim.clients[i]);
        insert(&mut sim.clients[i], start, word);
    }
    sim.flush(2);
    sim.deliver_all(0);
    sim.flush(0);
    sim.flush(1);
    sim.settle();

    assert_converged(&sim);
    let text = text_of(&sim.clients[0]);
    for word in ["one", "two", "three"] {
        assert!(text.contains(word), "{text}");
    }
}

#[test]
fn interleaved_delivery_converges() {
    let mut sim = Sim::new(doc("", "abc"), 2);
    insert(&mut sim.clients[0], 4, "1");
    assert!(sim.flush(0));
    insert(&mut sim.clients[1], 6, "2");
    insert(&mut sim.clients[0], 3, "0");
    sim.deliver_all(1);
    assert!(sim.flush(1));
    sim.deliver_all(0);
    sim.settle();

    assert_converged(&sim);
    assert_eq!(text_of(&sim.clients[0]), "0a1bc2");
}

// ── Properties ───────────────────────────────────────────────────

mod properties {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert { client: usize, at: usize, text: String },
        Delete { client: usize, at: usize, len: usize },
        Flush(usize),
        Deliver(usize),
    }

    const CLIENTS: usize = 3;

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..CLIENTS, 0..64usize, "[a-z]{1,3}")
                .prop_map(|(client, at, text)| Op::Insert { client, at, text }),
            1 => (0..CLIENTS, 0..64usize, 1..4usize)
                .prop_map(|(client, at, len)| Op::Delete { client, at, len }),
            2 => (0..CLIENTS).prop_map(Op::Flush),
            2 => (0..CLIENTS).prop_map(Op::Deliver),
        ]
    }

    fn run(sim: &mut Sim, op: &Op) {
        match op {
            Op::Insert { client, at, text } => {
                let (start, end) = body_range(&sim.clients[*client]);
                insert(&mut sim.clients[*client], start + at % (end - start + 1), text);
            }
            Op::Delete { client, at, len } => {
                let (start, end) = body_range(&sim.clients[*client]);
                if end > start {
                    let from = start + at % (end - start);
                    delete(&mut sim.clients[*client], from, (from + len).min(end));
                }
            }
            Op::Flush(client) => {
                sim.flush(*client);
            }
            Op::Deliver(client) => {
                sim.deliver(*client);
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn replicas_converge_to_the_authority(ops in proptest::collection::vec(op(), 1..40)) {
            let mut sim = Sim::new(doc("Shared", "start"), CLIENTS);
            for op in &ops {
                run(&mut sim, op);
            }
            sim.settle();

            let expected = sim.authority_json();
            for client in &sim.clients {
                prop_assert_eq!(json_of(client), expected.clone());
                prop_assert_eq!(client.version(), Some(sim.authority.version()));
                prop_assert_eq!(pending(client), 0);
            }
        }

        #[test]
        fn redelivery_never_changes_a_replica(text in "[a-z]{1,8}") {
            let mut sim = Sim::new(doc("", ""), 2);
            insert(&mut sim.clients[0], 3, &text);
            sim.flush(0);
            let batch = sim.inboxes[1].front().cloned().unwrap();
            sim.deliver_all(1);
            let before = json_of(&sim.clients[1]);

            let outcome = sim.clients[1].receive_remote_batch(batch).unwrap();
            prop_assert_eq!(outcome.skipped, 1);
            prop_assert_eq!(json_of(&sim.clients[1]), before);
        }
    }
}
