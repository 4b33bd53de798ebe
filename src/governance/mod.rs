//! Airline membership: bootstrap registration, funding and approval voting.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::SuretyParameters;
use crate::errors::{SuretyError, SuretyResult};
use crate::ledger::{AccountId, Amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

/// An airline known to the ledger, either registered or only funded so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub id: AccountId,
    pub state: RegistrationState,
    /// Cumulative value contributed; never decreases
    pub funded_amount: Amount,
}

impl Airline {
    fn unregistered(id: AccountId) -> Self {
        Airline {
            id,
            state: RegistrationState::Unregistered,
            funded_amount: Amount::ZERO,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
}

/// A vote-gated registration opened once the committee has left the bootstrap phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub id: u64,
    pub candidate: AccountId,
    pub status: RequestStatus,
    pub voters: BTreeSet<AccountId>,
    /// Committee size when the request was opened; fixes the majority for its lifetime
    pub committee_at_request: usize,
}

impl RegistrationRequest {
    pub fn vote_count(&self) -> usize {
        self.voters.len()
    }

    /// Votes needed for approval: ceil(committee / 2)
    pub fn votes_required(&self) -> usize {
        self.committee_at_request.div_ceil(2)
    }
}

/// Entry of the public registration queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: u64,
    pub airline: AccountId,
    pub status: RequestStatus,
}

/// What `register_airline` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Registered directly during bootstrap
    Registered { committee: usize },
    /// Opened a registration request that now needs votes
    Queued {
        request_id: u64,
        committee_at_request: usize,
    },
    /// The caller is not a member; nothing changed
    Ignored,
}

/// What `approve_registration` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { votes: usize, required: usize },
    /// This vote reached the majority and the candidate is now registered
    Approved {
        candidate: AccountId,
        votes: usize,
        committee: usize,
    },
    /// The voter had already voted on this request; nothing changed
    DuplicateVote { votes: usize },
    /// The request was approved earlier; nothing changed
    AlreadyApproved,
}

/// Membership and governance state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Membership {
    airlines: BTreeMap<AccountId, Airline>,
    requests: Vec<RegistrationRequest>,
    committee: usize,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the deployment's first airline unconditionally
    pub fn register_founder(&mut self, founder: AccountId) -> SuretyResult<usize> {
        if self.is_registered(&founder) {
            return Err(SuretyError::AlreadyRegistered(founder));
        }
        Ok(self.admit(founder))
    }

    pub fn register_airline(
        &mut self,
        params: &SuretyParameters,
        caller: &AccountId,
        candidate: AccountId,
    ) -> SuretyResult<RegistrationOutcome> {
        if self.is_registered(&candidate) {
            return Err(SuretyError::AlreadyRegistered(candidate));
        }

        if !self.is_registered(caller) {
            debug!("Ignoring registration of {} by non-member {}", candidate, caller);
            return Ok(RegistrationOutcome::Ignored);
        }

        if self.committee < params.bootstrap_committee_size {
            let committee = self.admit(candidate);
            return Ok(RegistrationOutcome::Registered { committee });
        }

        if let Some(pending) = self
            .requests
            .iter()
            .find(|r| r.candidate == candidate && r.status == RequestStatus::Pending)
        {
            return Err(SuretyError::AlreadyPending {
                candidate,
                request_id: pending.id,
            });
        }

        let request_id = self.requests.len() as u64;
        info!(
            "Registration request {} opened for {} (committee {})",
            request_id, candidate, self.committee
        );
        self.requests.push(RegistrationRequest {
            id: request_id,
            candidate,
            status: RequestStatus::Pending,
            voters: BTreeSet::new(),
            committee_at_request: self.committee,
        });

        Ok(RegistrationOutcome::Queued {
            request_id,
            committee_at_request: self.committee,
        })
    }

    pub fn approve_registration(
        &mut self,
        params: &SuretyParameters,
        voter: &AccountId,
        request_id: u64,
    ) -> SuretyResult<VoteOutcome> {
        let index = usize::try_from(request_id)
            .ok()
            .filter(|i| *i < self.requests.len())
            .ok_or(SuretyError::UnknownRegistrationRequest(request_id))?;

        self.ensure_funded_member(params, voter)?;

        let request = &mut self.requests[index];
        if request.status == RequestStatus::Approved {
            debug!("Vote by {} on approved request {} ignored", voter, request_id);
            return Ok(VoteOutcome::AlreadyApproved);
        }
        if !request.voters.insert(voter.clone()) {
            debug!("Duplicate vote by {} on request {} ignored", voter, request_id);
            return Ok(VoteOutcome::DuplicateVote {
                votes: request.vote_count(),
            });
        }

        let votes = request.vote_count();
        let required = request.votes_required();
        if votes < required {
            debug!("Request {} has {}/{} votes", request_id, votes, required);
            return Ok(VoteOutcome::Recorded { votes, required });
        }

        request.status = RequestStatus::Approved;
        let candidate = request.candidate.clone();
        let committee = self.admit(candidate.clone());
        Ok(VoteOutcome::Approved {
            candidate,
            votes,
            committee,
        })
    }

    /// Credit contributed value to an airline, creating an unregistered record if needed.
    /// Returns the new cumulative funding.
    pub fn fund(&mut self, airline: &AccountId, value: Amount) -> SuretyResult<Amount> {
        let current = self.membership_fee(airline);
        let total = current
            .checked_add(value)
            .ok_or(SuretyError::ArithmeticOverflow)?;
        self.airlines
            .entry(airline.clone())
            .or_insert_with(|| Airline::unregistered(airline.clone()))
            .funded_amount = total;
        info!("Airline {} funded {} (total {})", airline, value, total);
        Ok(total)
    }

    /// Fails unless `airline` is registered and has met the membership threshold
    pub fn ensure_funded_member(
        &self,
        params: &SuretyParameters,
        airline: &AccountId,
    ) -> SuretyResult<()> {
        let record = self
            .airlines
            .get(airline)
            .filter(|a| a.is_registered())
            .ok_or_else(|| SuretyError::NotAirline(airline.clone()))?;
        if record.funded_amount < params.membership_threshold {
            return Err(SuretyError::NotFunded {
                airline: airline.clone(),
                funded: record.funded_amount,
                required: params.membership_threshold,
            });
        }
        Ok(())
    }

    pub fn is_registered(&self, airline: &AccountId) -> bool {
        self.airlines.get(airline).is_some_and(Airline::is_registered)
    }

    pub fn airline(&self, airline: &AccountId) -> Option<&Airline> {
        self.airlines.get(airline)
    }

    pub fn committee(&self) -> usize {
        self.committee
    }

    pub fn membership_fee(&self, airline: &AccountId) -> Amount {
        self.airlines
            .get(airline)
            .map(|a| a.funded_amount)
            .unwrap_or_default()
    }

    /// Votes on the most recent registration request for `candidate`
    pub fn vote_count(&self, candidate: &AccountId) -> usize {
        self.requests
            .iter()
            .rev()
            .find(|r| &r.candidate == candidate)
            .map(RegistrationRequest::vote_count)
            .unwrap_or(0)
    }

    pub fn request(&self, request_id: u64) -> Option<&RegistrationRequest> {
        usize::try_from(request_id)
            .ok()
            .and_then(|i| self.requests.get(i))
    }

    pub fn registration_queue(&self) -> Vec<QueueEntry> {
        self.requests
            .iter()
            .map(|r| QueueEntry {
                id: r.id,
                airline: r.candidate.clone(),
                status: r.status,
            })
            .collect()
    }

    fn admit(&mut self, airline: AccountId) -> usize {
        self.airlines
            .entry(airline.clone())
            .or_insert_with(|| Airline::unregistered(airline.clone()))
            .state = RegistrationState::Registered;
        self.committee += 1;
        info!("Airline {} registered (committee {})", airline, self.committee);
        self.committee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> AccountId {
        AccountId::new(name)
    }

    /// Founder plus airlines 2..=4, bringing the committee to the bootstrap limit
    fn bootstrapped(params: &SuretyParameters) -> Membership {
        let mut membership = Membership::new();
        membership.register_founder(id("airline-1")).unwrap();
        for n in 2..=4 {
            membership
                .register_airline(params, &id("airline-1"), id(&format!("airline-{}", n)))
                .unwrap();
        }
        membership
    }

    #[test]
    fn test_bootstrap_registers_directly() {
        let params = SuretyParameters::default();
        let mut membership = Membership::new();
        membership.register_founder(id("airline-1")).unwrap();

        let outcome = membership
            .register_airline(&params, &id("airline-1"), id("airline-2"))
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Registered { committee: 2 });
        assert!(membership.is_registered(&id("airline-2")));
        assert!(membership.registration_queue().is_empty());
    }

    #[test]
    fn test_non_member_registration_is_ignored() {
        let params = SuretyParameters::default();
        let mut membership = Membership::new();
        membership.register_founder(id("airline-1")).unwrap();

        let outcome = membership
            .register_airline(&params, &id("stranger"), id("airline-2"))
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Ignored);
        assert!(!membership.is_registered(&id("airline-2")));
        assert_eq!(membership.committee(), 1);
    }

    #[test]
    fn test_registering_twice_fails() {
        let params = SuretyParameters::default();
        let mut membership = Membership::new();
        membership.register_founder(id("airline-1")).unwrap();

        // Even a non-member learns the candidate is taken.
        assert_eq!(
            membership.register_airline(&params, &id("owner"), id("airline-1")),
            Err(SuretyError::AlreadyRegistered(id("airline-1")))
        );
        assert_eq!(
            membership.register_founder(id("airline-1")),
            Err(SuretyError::AlreadyRegistered(id("airline-1")))
        );
    }

    #[test]
    fn test_consensus_phase_queues_requests() {
        let params = SuretyParameters::default();
        let mut membership = bootstrapped(&params);
        assert_eq!(membership.committee(), 4);

        let outcome = membership
            .register_airline(&params, &id("airline-4"), id("airline-5"))
            .unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::Queued {
                request_id: 0,
                committee_at_request: 4
            }
        );
        assert!(!membership.is_registered(&id("airline-5")));

        let queue = membership.registration_queue();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, 0);
        assert_eq!(queue[0].airline, id("airline-5"));
        assert_eq!(queue[0].status, RequestStatus::Pending);

        assert_eq!(
            membership.register_airline(&params, &id("airline-2"), id("airline-5")),
            Err(SuretyError::AlreadyPending {
                candidate: id("airline-5"),
                request_id: 0
            })
        );
    }

    #[test]
    fn test_unfunded_vote_is_rejected() {
        let params = SuretyParameters::default();
        let mut membership = bootstrapped(&params);
        membership
            .register_airline(&params, &id("airline-1"), id("airline-5"))
            .unwrap();

        let err = membership
            .approve_registration(&params, &id("airline-1"), 0)
            .unwrap_err();
        assert!(matches!(err, SuretyError::NotFunded { .. }));
        assert_eq!(membership.vote_count(&id("airline-5")), 0);
    }

    #[test]
    fn test_majority_of_committee_at_request_time() {
        let params = SuretyParameters::default();
        let mut membership = bootstrapped(&params);
        membership
            .register_airline(&params, &id("airline-1"), id("airline-5"))
            .unwrap();
        for n in 1..=2 {
            membership
                .fund(&id(&format!("airline-{}", n)), Amount::from_units(10))
                .unwrap();
        }

        let first = membership
            .approve_registration(&params, &id("airline-1"), 0)
            .unwrap();
        assert_eq!(
            first,
            VoteOutcome::Recorded {
                votes: 1,
                required: 2
            }
        );
        assert_eq!(membership.vote_count(&id("airline-5")), 1);
        assert!(!membership.is_registered(&id("airline-5")));

        let repeat = membership
            .approve_registration(&params, &id("airline-1"), 0)
            .unwrap();
        assert_eq!(repeat, VoteOutcome::DuplicateVote { votes: 1 });
        assert!(!membership.is_registered(&id("airline-5")));

        let second = membership
            .approve_registration(&params, &id("airline-2"), 0)
            .unwrap();
        assert_eq!(
            second,
            VoteOutcome::Approved {
                candidate: id("airline-5"),
                votes: 2,
                committee: 5
            }
        );
        assert!(membership.is_registered(&id("airline-5")));
        assert_eq!(membership.committee(), 5);
        assert_eq!(membership.registration_queue()[0].status, RequestStatus::Approved);

        let late = membership
            .approve_registration(&params, &id("airline-2"), 0)
            .unwrap();
        assert_eq!(late, VoteOutcome::AlreadyApproved);
        assert_eq!(membership.committee(), 5);
    }

    #[test]
    fn test_votes_from_outsiders_and_unknown_requests() {
        let params = SuretyParameters::default();
        let mut membership = bootstrapped(&params);
        membership.fund(&id("outsider"), Amount::from_units(50)).unwrap();

        assert_eq!(
            membership.approve_registration(&params, &id("airline-1"), 9),
            Err(SuretyError::UnknownRegistrationRequest(9))
        );

        membership
            .register_airline(&params, &id("airline-1"), id("airline-5"))
            .unwrap();
        assert_eq!(
            membership.approve_registration(&params, &id("outsider"), 0),
            Err(SuretyError::NotAirline(id("outsider")))
        );
    }

    #[test]
    fn test_funding_accumulates() {
        let mut membership = Membership::new();
        membership.register_founder(id("airline-1")).unwrap();

        membership.fund(&id("airline-1"), Amount::from_units(5)).unwrap();
        let total = membership.fund(&id("airline-1"), Amount::from_units(5)).unwrap();
        assert_eq!(total, Amount::from_units(10));
        assert_eq!(membership.membership_fee(&id("airline-1")), Amount::from_units(10));

        // Funding alone never registers an account.
        membership.fund(&id("hopeful"), Amount::from_units(1)).unwrap();
        assert!(!membership.is_registered(&id("hopeful")));
        assert_eq!(
            membership.airline(&id("hopeful")).map(|a| a.state),
            Some(RegistrationState::Unregistered)
        );
    }

    #[test]
    fn test_threshold_uses_ceiling_for_odd_committees() {
        let params = SuretyParameters::default();
        let mut membership = bootstrapped(&params);
        for n in 1..=4 {
            membership
                .fund(&id(&format!("airline-{}", n)), Amount::from_units(10))
                .unwrap();
        }
        membership
            .register_airline(&params, &id("airline-1"), id("airline-5"))
            .unwrap();
        membership.approve_registration(&params, &id("airline-1"), 0).unwrap();
        membership.approve_registration(&params, &id("airline-2"), 0).unwrap();
        assert_eq!(membership.committee(), 5);

        // Committee of 5 needs 3 votes.
        membership
            .register_airline(&params, &id("airline-1"), id("airline-6"))
            .unwrap();
        assert_eq!(membership.request(1).unwrap().votes_required(), 3);
        membership.approve_registration(&params, &id("airline-1"), 1).unwrap();
        membership.approve_registration(&params, &id("airline-2"), 1).unwrap();
        assert!(!membership.is_registered(&id("airline-6")));
        membership.approve_registration(&params, &id("airline-3"), 1).unwrap();
        assert!(membership.is_registered(&id("airline-6")));
    }
}
