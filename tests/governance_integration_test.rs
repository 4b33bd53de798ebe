mod common;

use common::*;
use flightsure_core::governance::{RequestStatus, VoteOutcome};
use flightsure_core::{RegistrationOutcome, SuretyError, SuretyEvent};

#[test]
fn test_first_four_airlines_join_without_votes() {
    let surety = deploy();
    for (i, expected_committee) in (2..=4).zip(2..) {
        let outcome = surety
            .register_airline(&tx("airline-1"), id(&format!("airline-{}", i)))
            .unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::Registered {
                committee: expected_committee
            }
        );
    }
    assert_eq!(surety.committee(), 4);
    // No funding was needed to register during bootstrap.
    assert_eq!(surety.total_fund(), units(0));
    assert!(surety.registration_queue().is_empty());
}

#[test]
fn test_registration_by_non_member_is_ignored() {
    let surety = deploy();
    let outcome = surety
        .register_airline(&tx("stranger"), id("airline-2"))
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Ignored);
    assert!(!surety.is_airline_registered(&id("airline-2")));
    assert_eq!(surety.committee(), 1);
}

#[test]
fn test_already_registered_is_checked_first() {
    let surety = deploy();
    surety.register_airline(&tx("airline-1"), id("airline-2")).unwrap();
    // Even a non-member caller is told the candidate is already registered.
    assert_eq!(
        surety.register_airline(&tx("stranger"), id("airline-2")),
        Err(SuretyError::AlreadyRegistered(id("airline-2")))
    );
}

#[test]
fn test_fifth_airline_needs_half_the_committee() {
    let surety = deploy();
    bootstrap_committee(&surety, 4);

    let outcome = surety
        .register_airline(&tx("airline-1"), id("airline-5"))
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Queued {
            request_id: 0,
            committee_at_request: 4
        }
    );
    assert!(!surety.is_airline_registered(&id("airline-5")));

    assert_eq!(
        surety.approve_registration(&tx("airline-1"), 0),
        Ok(VoteOutcome::Recorded { votes: 1, required: 2 })
    );
    assert_eq!(
        surety.approve_registration(&tx("airline-1"), 0),
        Ok(VoteOutcome::DuplicateVote { votes: 1 })
    );
    assert_eq!(surety.vote_count(&id("airline-5")), 1);

    assert_eq!(
        surety.approve_registration(&tx("airline-3"), 0),
        Ok(VoteOutcome::Approved {
            candidate: id("airline-5"),
            votes: 2,
            committee: 5
        })
    );
    assert!(surety.is_airline_registered(&id("airline-5")));
    assert_eq!(surety.committee(), 5);

    let queue = surety.registration_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].airline, id("airline-5"));
    assert_eq!(queue[0].status, RequestStatus::Approved);

    assert_eq!(
        surety.approve_registration(&tx("airline-4"), 0),
        Ok(VoteOutcome::AlreadyApproved)
    );
    assert_eq!(surety.committee(), 5);
}

#[test]
fn test_majority_uses_committee_size_at_request() {
    let surety = deploy();
    bootstrap_committee(&surety, 4);

    surety.register_airline(&tx("airline-1"), id("airline-5")).unwrap();
    surety.register_airline(&tx("airline-1"), id("airline-6")).unwrap();
    surety.approve_registration(&tx("airline-1"), 0).unwrap();
    surety.approve_registration(&tx("airline-2"), 0).unwrap();
    assert_eq!(surety.committee(), 5);

    // Request 1 was opened with a committee of 4, so two votes still suffice.
    surety.approve_registration(&tx("airline-1"), 1).unwrap();
    assert!(matches!(
        surety.approve_registration(&tx("airline-2"), 1),
        Ok(VoteOutcome::Approved { committee: 6, .. })
    ));

    // A request opened with a committee of 6 needs three.
    surety.register_airline(&tx("airline-1"), id("airline-7")).unwrap();
    let request = surety.registration_request(2).unwrap();
    assert_eq!(request.committee_at_request, 6);
    assert_eq!(request.votes_required(), 3);
}

#[test]
fn test_voting_requires_funded_member() {
    let surety = deploy();
    for i in 2..=4 {
        surety
            .register_airline(&tx("airline-1"), id(&format!("airline-{}", i)))
            .unwrap();
    }
    surety.register_airline(&tx("airline-1"), id("airline-5")).unwrap();

    assert!(matches!(
        surety.approve_registration(&tx("airline-2"), 0),
        Err(SuretyError::NotFunded { .. })
    ));
    assert_eq!(
        surety.approve_registration(&tx("stranger"), 0),
        Err(SuretyError::NotAirline(id("stranger")))
    );
    assert_eq!(
        surety.approve_registration(&tx("airline-2"), 9),
        Err(SuretyError::UnknownRegistrationRequest(9))
    );

    surety.fund(&paying("airline-2", units(9))).unwrap();
    assert!(matches!(
        surety.approve_registration(&tx("airline-2"), 0),
        Err(SuretyError::NotFunded { .. })
    ));
    surety.fund(&paying("airline-2", units(1))).unwrap();
    assert!(surety.approve_registration(&tx("airline-2"), 0).is_ok());
    assert_eq!(surety.vote_count(&id("airline-5")), 1);
}

#[test]
fn test_pending_candidate_cannot_be_queued_twice() {
    let surety = deploy();
    bootstrap_committee(&surety, 4);
    surety.register_airline(&tx("airline-1"), id("airline-5")).unwrap();
    assert_eq!(
        surety.register_airline(&tx("airline-2"), id("airline-5")),
        Err(SuretyError::AlreadyPending {
            candidate: id("airline-5"),
            request_id: 0
        })
    );
}

#[test]
fn test_funding_accumulates_before_registration() {
    let surety = deploy();
    surety.fund(&paying("airline-2", amount("2.5"))).unwrap();
    surety.fund(&paying("airline-2", amount("7.5"))).unwrap();
    assert_eq!(surety.membership_fee(&id("airline-2")), units(10));
    assert!(!surety.is_airline_registered(&id("airline-2")));

    // Prior funding counts as soon as the airline is registered.
    surety.register_airline(&tx("airline-1"), id("airline-2")).unwrap();
    assert!(surety
        .register_flight(&tx("airline-2"), "EARLY1", DEPARTURE)
        .is_ok());
}

#[test]
fn test_governance_events_are_emitted_in_order() {
    let surety = deploy();
    bootstrap_committee(&surety, 4);
    let start = surety.history().len() as u64;

    surety.register_airline(&tx("airline-1"), id("airline-5")).unwrap();
    surety.approve_registration(&tx("airline-1"), 0).unwrap();
    surety.approve_registration(&tx("airline-2"), 0).unwrap();

    let events: Vec<SuretyEvent> = surety
        .events_since(start)
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(
        events,
        vec![
            SuretyEvent::RegistrationQueued {
                request_id: 0,
                candidate: id("airline-5"),
                committee_at_request: 4
            },
            SuretyEvent::RegistrationVote {
                request_id: 0,
                voter: id("airline-1"),
                votes: 1
            },
            SuretyEvent::RegistrationVote {
                request_id: 0,
                voter: id("airline-2"),
                votes: 2
            },
            SuretyEvent::AirlineRegistered {
                airline: id("airline-5"),
                committee: 5
            },
        ]
    );
}
