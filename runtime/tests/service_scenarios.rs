//! Concurrency and lifecycle scenarios for the ticket service.
//!
//! Run with: `cargo test -p box-office-runtime --test service_scenarios -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use box_office_core::{SeatHold, TicketingError};
use box_office_runtime::{ServiceConfig, TicketService};
use box_office_testing::helpers::test_venue;
use box_office_testing::{ManualClock, assert_accounting, init_test_tracing};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(30);

fn service(rows: u32, per_row: u32) -> (TicketService, Arc<ManualClock>) {
    let (venue, clock) = test_venue(rows, per_row);
    let config = ServiceConfig::default().with_hold_ttl(TTL);
    (
        TicketService::without_sweeper(Arc::new(venue), &config).unwrap(),
        clock,
    )
}

fn customer(n: usize) -> String {
    format!("fan{n}@example.com")
}

fn check(service: &TicketService) {
    let holds = service.active_holds();
    let live: Vec<&SeatHold> = holds.iter().map(|hold| &**hold).collect();
    assert_accounting(service.venue(), &live);
}

/// N concurrent single-seat holds against exactly N seats: every caller gets
/// one seat and no seat is handed out twice.
#[test]
fn test_exact_capacity_concurrent_holds() {
    init_test_tracing();
    for n in [1u32, 10, 1000] {
        for _round in 0..3 {
            let (service, _clock) = service(n, 1);
            let holds: Vec<Arc<SeatHold>> = std::thread::scope(|scope| {
                let callers: Vec<_> = (0..n as usize)
                    .map(|i| {
                        let service = &service;
                        scope.spawn(move || service.find_and_hold_seats(1, &customer(i)).unwrap())
                    })
                    .collect();
                callers
                    .into_iter()
                    .map(|caller| caller.join().expect("caller panicked"))
                    .collect()
            });

            assert!(holds.iter().all(|hold| hold.num_seats_held() == 1));
            let distinct: HashSet<_> = holds.iter().flat_map(|hold| hold.seats()).collect();
            assert_eq!(distinct.len(), n as usize);
            assert_eq!(service.num_seats_available(), 0);
            assert_eq!(service.num_active_holds(), n as usize);
            check(&service);
        }
    }
}

/// Reservations racing the sweep: expired holds are never reserved and live
/// holds are never reclaimed.
#[test]
fn test_reserve_races_sweep() {
    init_test_tracing();
    let (service, clock) = service(10, 20);

    let stale: Vec<_> = (0..50)
        .map(|i| service.find_and_hold_seats(2, &customer(i)).unwrap())
        .collect();
    clock.advance(Duration::from_secs(20));
    let fresh: Vec<_> = (50..100)
        .map(|i| service.find_and_hold_seats(2, &customer(i)).unwrap())
        .collect();
    clock.advance(Duration::from_secs(10));

    let (stale_results, fresh_results) = std::thread::scope(|scope| {
        let sweeper = scope.spawn(|| {
            for _ in 0..20 {
                service.sweep_expired().unwrap();
            }
        });
        let stale_results = scope.spawn(|| {
            stale
                .iter()
                .enumerate()
                .map(|(i, hold)| service.reserve_seats(hold.id(), &customer(i)))
                .collect::<Vec<_>>()
        });
        let fresh_results = scope.spawn(|| {
            fresh
                .iter()
                .enumerate()
                .map(|(i, hold)| service.reserve_seats(hold.id(), &customer(i + 50)))
                .collect::<Vec<_>>()
        });
        sweeper.join().expect("sweeper panicked");
        (
            stale_results.join().expect("reserver panicked"),
            fresh_results.join().expect("reserver panicked"),
        )
    });

    for result in stale_results {
        assert!(matches!(
            result,
            Err(TicketingError::Expired(_) | TicketingError::NotFound(_))
        ));
    }
    assert!(fresh_results.iter().all(Result::is_ok));

    let snapshot = service.inventory();
    assert_eq!(snapshot.reservations, 50);
    assert_eq!(snapshot.reserved, 100);
    assert_eq!(snapshot.held, 0);
    assert_eq!(snapshot.available, 100);
    assert_eq!(service.num_active_holds(), 0);
    check(&service);
}

/// Holding, reserving and cancelling from many threads keeps the books
/// balanced.
#[test]
fn test_mixed_workload_keeps_accounting() {
    let (service, clock) = service(20, 30);

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let service = &service;
            scope.spawn(move || {
                let email = customer(worker);
                for round in 0..50 {
                    let hold = service.find_and_hold_seats(1 + round % 5, &email).unwrap();
                    if hold.num_seats_held() == 0 {
                        continue;
                    }
                    match round % 3 {
                        0 => {
                            let code = service.reserve_seats(hold.id(), &email).unwrap();
                            service.cancel_reservation(code.as_str()).unwrap();
                        }
                        1 => {
                            service.reserve_seats(hold.id(), &email).unwrap();
                        }
                        _ => {}
                    }
                }
            });
        }
    });
    check(&service);

    clock.advance(TTL);
    let report = service.sweep_expired().unwrap();
    assert_eq!(report.failures, 0);
    assert_eq!(service.num_seats_held(), 0);
    assert_eq!(service.num_active_holds(), 0);
    let snapshot = assert_accounting(service.venue(), &[]);
    assert_eq!(snapshot.available + snapshot.reserved, 600);
}

/// Nine seats: the best two go first, a greedy request takes the rest.
#[test]
fn test_small_venue_walkthrough() {
    let (service, clock) = service(3, 3);
    let email = "me@you.com";

    let best = service.find_and_hold_seats(2, email).unwrap();
    let labels: Vec<_> = best
        .seats()
        .into_iter()
        .map(|i| service.venue().seat(i).unwrap().id().to_string())
        .collect();
    assert_eq!(labels, ["Row 1 Seat 2", "Row 1 Seat 1"]);

    let rest = service.find_and_hold_seats(9, email).unwrap();
    assert_eq!(rest.num_seats_held(), 7);
    assert_eq!(service.num_seats_available(), 0);

    let code = service.reserve_seats(best.id(), email).unwrap();
    clock.advance(TTL);
    let report = service.sweep_expired().unwrap();
    assert_eq!(report.seats_released, 7);
    assert_eq!(service.num_seats_available(), 7);

    service.cancel_reservation(code.as_str()).unwrap();
    assert_eq!(service.num_seats_available(), 9);
}
