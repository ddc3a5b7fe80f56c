mod common;

use common::*;
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::Arc;
use swim_probe::core::Message;
use swim_probe::membership::{GossipRecord, Membership};
use swim_probe::probe::{ProbeEvent, ProbePhase, Prober, ProberConfig};
use swim_probe::testkit::{FailingTransport, RecordingTransport, Sent};
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn acked_rounds_keep_the_period() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |_, msg| match msg {
    Message::Ping { .. } => Some(ms(50)),
    _ => None,
  });
  let mut prober = prober(me(), &membership, transport, |_: usize| -> u64 { 0 });
  let mut events = prober.subscribe();
  let start = Instant::now();
  let handle = prober.spawn();

  sleep(ms(3500)).await;
  let report = handle.leave().await.unwrap();
  // The fourth round was in progress when termination was requested and ran to its end.
  assert!(start.elapsed() >= ms(4000));

  let sent = sent.try_iter().collect::<Vec<_>>();
  let pings = pings(&sent);
  assert_eq!(pings.len(), 4);
  assert!(ping_reqs(&sent).is_empty());
  assert_eq!(pings.iter().map(|s| round_of(s)).collect_vec(), vec![1, 2, 3, 4]);
  for (earlier, later) in pings.iter().tuple_windows() {
    assert_gap(earlier, later, PERIOD);
  }
  // The first permutation covers the whole directory before any peer repeats.
  let first_three = pings[..3].iter().map(|s| s.to.clone()).collect::<HashSet<_>>();
  assert_eq!(first_three, peers(&["b", "c", "d"]).into_iter().collect::<HashSet<_>>());

  assert_eq!(report.rounds, 4);
  assert_eq!(report.acked, 4);
  assert_eq!(report.failures, 0);
  assert_eq!(membership.directory.len(), 3);
  assert_eq!(membership.round.current(), 4);
  let events = drain(&mut events);
  assert_eq!(events.len(), 5);
  assert!(events[..4]
    .iter()
    .all(|e| matches!(e, ProbeEvent::Acked { phase: ProbePhase::Direct, .. })));
  assert_eq!(events[4], ProbeEvent::Terminated);
}

#[tokio::test(start_paused = true)]
async fn silent_peer_is_removed_and_gossiped() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |to, msg| match msg {
    Message::Ping { .. } if to.as_str() != "b" => Some(ms(50)),
    _ => None,
  });
  let mut prober = prober(me(), &membership, transport, |n: usize| n as u64);
  let mut events = prober.subscribe();
  let handle = prober.spawn();

  sleep(ms(3500)).await;
  handle.leave().await.unwrap();

  let failed = drain(&mut events)
    .into_iter()
    .filter_map(|e| match e {
      ProbeEvent::Failed { round, peer, expiry } => Some((round, peer, expiry)),
      _ => None,
    })
    .collect::<Vec<_>>();
  assert_eq!(failed.len(), 1);
  let (round, peer, expiry) = failed[0].clone();
  assert_eq!(peer, id("b"));
  // Spread time is measured on the directory as it was when the failure was declared.
  assert_eq!(expiry, round + 3);
  assert!(!membership.directory.contains(&id("b")));
  assert_eq!(membership.directory.len(), 2);
  assert_eq!(membership.gossip.expiry(&GossipRecord::failed(id("b"))), Some(round + 3));

  let sent = sent.try_iter().collect::<Vec<_>>();
  let reqs = ping_reqs(&sent);
  assert_eq!(reqs.len(), 2);
  assert!(reqs.iter().all(|s| round_of(s) == round && target_of(s) == &id("b")));
  let relayers = reqs.iter().map(|s| s.to.clone()).collect::<HashSet<_>>();
  assert_eq!(relayers, peers(&["c", "d"]).into_iter().collect::<HashSet<_>>());

  let pings = pings(&sent);
  let direct = pings.iter().find(|s| round_of(s) == round).unwrap();
  assert_eq!(direct.to, id("b"));
  assert_gap(direct, reqs[0], PING_TIMEOUT);
  // The next round starts one period after the failed one and already carries the news.
  let next = pings.iter().find(|s| round_of(s) == round + 1).unwrap();
  assert_gap(direct, next, PERIOD);
  assert!(next.msg.gossip().contains(&GossipRecord::failed(id("b"))));
}

#[tokio::test(start_paused = true)]
async fn indirect_ack_keeps_peer() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |to, msg| match msg {
    Message::Ping { .. } if to.as_str() != "b" => Some(ms(50)),
    Message::PingReq { target, .. } if target.as_str() == "b" => Some(ms(100)),
    _ => None,
  });
  let mut prober = prober(me(), &membership, transport, |n: usize| n as u64);
  let mut events = prober.subscribe();
  let handle = prober.spawn();

  sleep(ms(3500)).await;
  handle.leave().await.unwrap();

  let events = drain(&mut events);
  assert!(events.iter().all(|e| !matches!(e, ProbeEvent::Failed { .. })));
  let round = events
    .iter()
    .find_map(|e| match e {
      ProbeEvent::Acked { round, peer, phase: ProbePhase::Indirect } if peer.as_str() == "b" => {
        Some(*round)
      }
      _ => None,
    })
    .expect("b acked through the subgroup");
  assert_eq!(membership.directory.len(), 3);
  assert!(membership.gossip.is_empty());

  // Success through the subgroup still sleeps out the whole period.
  let sent = sent.try_iter().collect::<Vec<_>>();
  let pings = pings(&sent);
  let direct = pings.iter().find(|s| round_of(s) == round).unwrap();
  let next = pings.iter().find(|s| round_of(s) == round + 1).unwrap();
  assert_gap(direct, next, PERIOD);
}

#[tokio::test(start_paused = true)]
async fn introducer_is_never_removed() {
  let membership = Membership::new(peers(&["intro"]));
  let (transport, sent) = RecordingTransport::new();
  let mut prober = prober(me(), &membership, transport, |_: usize| -> u64 { 0 });
  let mut events = prober.subscribe();
  let handle = prober.spawn();

  sleep(ms(1500)).await;
  let report = handle.leave().await.unwrap();

  let sent = sent.try_iter().collect::<Vec<_>>();
  assert!(ping_reqs(&sent).is_empty());
  let pings = pings(&sent);
  assert_eq!(pings.len(), 2);
  assert!(pings.iter().all(|s| s.to == id("intro")));
  // With no relayer available the round still waits out its residual budget.
  assert_gap(pings[0], pings[1], PERIOD);

  assert_eq!(
    drain(&mut events),
    vec![
      ProbeEvent::IntroducerUnreachable { round: 1, peer: id("intro") },
      ProbeEvent::IntroducerUnreachable { round: 2, peer: id("intro") },
      ProbeEvent::Terminated,
    ]
  );
  assert!(membership.directory.contains(&id("intro")));
  assert!(membership.gossip.is_empty());
  assert_eq!(report.introducer_timeouts, 2);
  assert_eq!(report.failures, 0);
}

#[tokio::test(start_paused = true)]
async fn at_most_k_relayers() {
  let membership = Membership::new(peers(&["a", "b", "c", "d", "e", "f", "g"]));
  let (transport, sent) = RecordingTransport::new();
  let prober = prober(me(), &membership, transport, |_: usize| -> u64 { 0 });
  let handle = prober.spawn();

  sleep(ms(500)).await;
  handle.leave().await.unwrap();

  let sent = sent.try_iter().collect::<Vec<_>>();
  let pings = pings(&sent);
  assert_eq!(pings.len(), 1);
  let candidate = pings[0].to.clone();
  assert_ne!(candidate, id("a"));
  let reqs = ping_reqs(&sent);
  assert_eq!(reqs.len(), 2);
  let relayers = reqs.iter().map(|s| s.to.clone()).collect::<HashSet<_>>();
  assert_eq!(relayers.len(), 2);
  assert!(!relayers.contains(&candidate));
  assert!(!relayers.contains(&id("a")));
  assert!(reqs.iter().all(|s| target_of(s) == &candidate));
}

#[tokio::test(start_paused = true)]
async fn small_group_uses_every_other_peer() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, sent) = RecordingTransport::new();
  let mut cfg = config();
  cfg.subgroup_k = 10;
  let prober = Prober::new(
    cfg,
    me(),
    membership.clone(),
    Arc::new(transport),
    Arc::new(|_: usize| -> u64 { 0 }),
  );
  let handle = prober.spawn();

  sleep(ms(500)).await;
  handle.leave().await.unwrap();

  let sent = sent.try_iter().collect::<Vec<_>>();
  let candidate = pings(&sent)[0].to.clone();
  let relayers = ping_reqs(&sent).iter().map(|s| s.to.clone()).collect::<HashSet<_>>();
  let expected = peers(&["b", "c", "d"])
    .into_iter()
    .filter(|p| *p != candidate)
    .collect::<HashSet<_>>();
  assert_eq!(relayers, expected);
}

#[tokio::test(start_paused = true)]
async fn stale_gossip_leaves_payloads() {
  let membership = Membership::new(peers(&["b"]));
  membership.gossip.insert(GossipRecord::joined(id("x")), 3);
  let (transport, sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |_, _| Some(ms(10)));
  let prober = prober(me(), &membership, transport, |_: usize| -> u64 { 0 });
  let handle = prober.spawn();

  sleep(ms(3500)).await;
  handle.leave().await.unwrap();

  let sent = sent.try_iter().collect::<Vec<_>>();
  let carried = pings(&sent)
    .iter()
    .map(|s| (round_of(s), s.msg.gossip().contains(&GossipRecord::joined(id("x")))))
    .collect::<Vec<_>>();
  assert_eq!(carried, vec![(1, true), (2, true), (3, false), (4, false)]);
  assert!(membership.gossip.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failure_record_is_not_refreshed() {
  let membership = Membership::new(peers(&["b"]));
  membership.gossip.insert(GossipRecord::failed(id("b")), 50);
  let (transport, _sent) = RecordingTransport::new();
  let mut prober = prober(me(), &membership, transport, |n: usize| n as u64);
  let mut events = prober.subscribe();
  let handle = prober.spawn();

  sleep(ms(500)).await;
  handle.leave().await.unwrap();

  assert_eq!(
    drain(&mut events)[0],
    ProbeEvent::Failed { round: 1, peer: id("b"), expiry: 50 }
  );
  assert_eq!(membership.gossip.expiry(&GossipRecord::failed(id("b"))), Some(50));
  assert!(membership.directory.is_empty());
}

#[tokio::test(start_paused = true)]
async fn send_failures_do_not_stop_probing() {
  let membership = Membership::new(peers(&["b", "c"]));
  let transport = Arc::new(FailingTransport::default());
  let prober = Prober::new(
    config(),
    me(),
    membership.clone(),
    transport.clone(),
    Arc::new(|_: usize| -> u64 { 1 }),
  );
  let handle = prober.spawn();

  sleep(ms(2500)).await;
  let report = handle.leave().await.unwrap();

  // Both peers look dead: every message was lost.
  assert_eq!(report.rounds, 2);
  assert_eq!(report.failures, 2);
  // Round one: ping plus one relayer. Round two: ping, nobody left to relay.
  assert_eq!(report.send_failures, 3);
  assert_eq!(transport.attempts(), 3);
  assert!(membership.directory.is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_directory_backs_off() {
  let membership = Membership::new(Vec::new());
  let (transport, sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |_, _| Some(ms(10)));
  let prober = prober(me(), &membership, transport, |_: usize| -> u64 { 1 });
  let handle = prober.spawn();

  sleep(ms(5500)).await;
  assert_eq!(membership.round.current(), 0);
  assert!(sent.try_iter().next().is_none());

  membership.directory.insert(id("b"));
  sleep(ms(1000)).await;
  let report = handle.leave().await.unwrap();

  let sent = sent.try_iter().collect::<Vec<_>>();
  assert_eq!(sent.len(), 2);
  assert_eq!(sent[0].to, id("b"));
  assert!(sent[0].msg.gossip().is_empty());
  // The second one is the departure announcement.
  assert_eq!(sent[1].msg.gossip(), &[GossipRecord::left(id("a"))][..]);
  assert_eq!(report.rounds, 1);
  assert_eq!(membership.round.current(), 2);
}

#[tokio::test(start_paused = true)]
async fn self_is_never_probed() {
  let membership = Membership::new(peers(&["a"]));
  let (transport, sent) = RecordingTransport::new();
  let prober = prober(me(), &membership, transport, |_: usize| -> u64 { 5 });
  let handle = prober.spawn();

  sleep(ms(2500)).await;
  let report = handle.leave().await.unwrap();

  assert!(sent.try_iter().collect::<Vec<Sent>>().is_empty());
  assert_eq!(report.rounds, 0);
  assert_eq!(report.leave_announcements, 0);
  assert!(membership.directory.contains(&id("a")));
}

#[tokio::test(start_paused = true)]
async fn ping_timeout_longer_than_period_is_capped() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, sent) = RecordingTransport::new();
  let cfg = ProberConfig {
    ping_timeout: ms(1500),
    ..config()
  };
  let mut prober = prober_with(cfg, me(), &membership, transport, |_: usize| -> u64 { 0 });
  let mut events = prober.subscribe();
  let start = Instant::now();
  let handle = prober.spawn();

  sleep(ms(500)).await;
  handle.leave().await.unwrap();
  // The whole round, both phases included, still fits in one period.
  let elapsed = start.elapsed();
  assert!(elapsed >= PERIOD && elapsed < PERIOD + ms(5));

  let sent = sent.try_iter().collect::<Vec<_>>();
  let pings = pings(&sent);
  let reqs = ping_reqs(&sent);
  assert_eq!(pings.len(), 1);
  assert_eq!(reqs.len(), 2);
  assert_gap(pings[0], reqs[0], PERIOD);
  let silent = pings[0].to.clone();
  assert_eq!(
    drain(&mut events),
    vec![
      ProbeEvent::Failed { round: 1, peer: silent.clone(), expiry: 1 },
      ProbeEvent::Terminated,
    ]
  );
  assert!(!membership.directory.contains(&silent));
}

#[tokio::test(start_paused = true)]
async fn late_direct_ack_counts_during_indirect_wait() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |_, msg| match msg {
    Message::Ping { .. } => Some(ms(400)),
    _ => None,
  });
  let mut prober = prober(me(), &membership, transport, |_: usize| -> u64 { 0 });
  let mut events = prober.subscribe();
  let handle = prober.spawn();

  sleep(ms(500)).await;
  let report = handle.leave().await.unwrap();

  let sent = sent.try_iter().collect::<Vec<_>>();
  let pings = pings(&sent);
  assert_eq!(pings.len(), 1);
  assert_eq!(ping_reqs(&sent).len(), 2);
  assert_eq!(
    drain(&mut events),
    vec![
      ProbeEvent::Acked { round: 1, peer: pings[0].to.clone(), phase: ProbePhase::Indirect },
      ProbeEvent::Terminated,
    ]
  );
  assert_eq!(report.acked, 1);
  assert_eq!(report.failures, 0);
  assert_eq!(membership.directory.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn unbounded_spread_time_saturates() {
  let membership = Membership::new(peers(&["b", "c"]));
  let (transport, sent) = RecordingTransport::new();
  let prober = prober(me(), &membership, transport, |_: usize| -> u64 { u64::MAX });
  let handle = prober.spawn();

  sleep(ms(2500)).await;
  let report = handle.leave().await.expect("prober survives");

  assert_eq!(report.failures, 2);
  assert!(membership.directory.is_empty());
  for peer in &["b", "c"] {
    assert_eq!(membership.gossip.expiry(&GossipRecord::failed(id(peer))), Some(u64::MAX));
  }
  let sent = sent.try_iter().collect::<Vec<_>>();
  let pings = pings(&sent);
  assert_eq!(pings.len(), 2);
  let first = pings[0].to.clone();
  assert!(pings[1].msg.gossip().contains(&GossipRecord::failed(first)));
}

#[tokio::test(start_paused = true)]
async fn slow_subscriber_loses_events_not_rounds() {
  let membership = Membership::new(peers(&["b", "c", "d"]));
  let (transport, _sent) = RecordingTransport::new();
  let transport = transport.acking(membership.ack.clone(), |_, msg| match msg {
    Message::Ping { .. } => Some(ms(50)),
    _ => None,
  });
  let cfg = ProberConfig {
    event_capacity: 2,
    ..config()
  };
  let mut prober = prober_with(cfg, me(), &membership, transport, |_: usize| -> u64 { 0 });
  let mut events = prober.subscribe();
  let handle = prober.spawn();

  sleep(ms(4500)).await;
  let report = handle.leave().await.unwrap();

  assert_eq!(report.rounds, 5);
  assert_eq!(report.acked, 5);
  // Five acks and the termination, of which only the first two fit.
  assert_eq!(report.dropped_events, 4);
  let events = drain(&mut events);
  assert_eq!(events.len(), 2);
  assert!(matches!(events[0], ProbeEvent::Acked { round: 1, .. }));
  assert!(matches!(events[1], ProbeEvent::Acked { round: 2, .. }));
}
