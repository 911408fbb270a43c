//! Resource Ledger
//!
//! Stockpiled resource stacks and the reservations held against them. Every
//! operation takes the ledger lock for its whole duration, so a find followed
//! by a reserve inside [`ResourceLedger::claim`] cannot interleave with another
//! worker's claim.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::components::thing::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackId(pub u64);

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack_{:04}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

/// A physical pile of one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStack {
    pub id: StackId,
    pub resource: String,
    pub position: Position,
    pub quantity: u32,
    /// Units promised to outstanding reservations
    pub reserved: u32,
    pub forbidden: bool,
}

impl ResourceStack {
    pub fn unreserved(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved)
    }
}

/// Claim on `count` units of one stack.
///
/// Tokens are plain data so that work orders holding them can be saved and
/// restored; the ledger is the authority on how much of a token is still live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationToken {
    pub id: ReservationId,
    pub stack: StackId,
    pub resource: String,
    pub count: u32,
}

/// How many units to take from which stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPick {
    pub stack: StackId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{stack} has {available} unreserved units, {requested} requested")]
    ResourceUnavailable {
        stack: StackId,
        requested: u32,
        available: u32,
    },
    #[error("not enough {resource} available")]
    Insufficient { resource: String },
    #[error("{0} no longer exists")]
    UnknownStack(StackId),
    #[error("reservation {id:?} holds {remaining} units, {requested} requested")]
    Overdraw {
        id: ReservationId,
        requested: u32,
        remaining: u32,
    },
    #[error("zero-unit reservation requested on {0}")]
    EmptyRequest(StackId),
}

/// Running totals over every reservation ever made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub reserved: u64,
    pub released: u64,
    pub consumed: u64,
}

impl LedgerTotals {
    /// Units reserved but neither released nor consumed yet
    pub fn outstanding(&self) -> u64 {
        self.reserved - self.released - self.consumed
    }
}

#[derive(Debug, Clone)]
struct Reservation {
    stack: StackId,
    remaining: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    stacks: BTreeMap<StackId, ResourceStack>,
    reservations: HashMap<ReservationId, Reservation>,
    totals: LedgerTotals,
    next_stack: u64,
    next_reservation: u64,
}

impl LedgerState {
    fn find(
        &self,
        resource: &str,
        quantity: u32,
        near: Position,
        usable: &dyn Fn(&ResourceStack) -> bool,
    ) -> Option<Vec<StackPick>> {
        if quantity == 0 {
            return Some(Vec::new());
        }

        // BTreeMap iteration is discovery order, and the sort is stable, so
        // equidistant stacks keep that order.
        let mut candidates: Vec<&ResourceStack> = self
            .stacks
            .values()
            .filter(|s| s.resource == resource && !s.forbidden && s.unreserved() > 0)
            .filter(|s| usable(*s))
            .collect();
        candidates.sort_by_key(|s| s.position.manhattan(&near));

        let mut picks = Vec::new();
        let mut gathered = 0;
        for stack in candidates {
            let take = stack.unreserved().min(quantity - gathered);
            picks.push(StackPick {
                stack: stack.id,
                count: take,
            });
            gathered += take;
            if gathered >= quantity {
                return Some(picks);
            }
        }
        None
    }

    fn reserve(&mut self, stack_id: StackId, count: u32) -> Result<ReservationToken, LedgerError> {
        if count == 0 {
            return Err(LedgerError::EmptyRequest(stack_id));
        }
        let stack = self
            .stacks
            .get_mut(&stack_id)
            .ok_or(LedgerError::UnknownStack(stack_id))?;
        let available = if stack.forbidden { 0 } else { stack.unreserved() };
        if count > available {
            return Err(LedgerError::ResourceUnavailable {
                stack: stack_id,
                requested: count,
                available,
            });
        }

        stack.reserved += count;
        let resource = stack.resource.clone();
        self.next_reservation += 1;
        let id = ReservationId(self.next_reservation);
        self.reservations.insert(
            id,
            Reservation {
                stack: stack_id,
                remaining: count,
            },
        );
        self.totals.reserved += u64::from(count);

        Ok(ReservationToken {
            id,
            stack: stack_id,
            resource,
            count,
        })
    }

    fn release(&mut self, token: &ReservationToken) -> u32 {
        let Some(reservation) = self.reservations.remove(&token.id) else {
            return 0;
        };
        if let Some(stack) = self.stacks.get_mut(&reservation.stack) {
            stack.reserved = stack.reserved.saturating_sub(reservation.remaining);
        }
        self.totals.released += u64::from(reservation.remaining);
        reservation.remaining
    }

    fn withdraw(&mut self, token: &ReservationToken, count: u32) -> Result<u32, LedgerError> {
        let reservation = self
            .reservations
            .get(&token.id)
            .cloned()
            .ok_or(LedgerError::Overdraw {
                id: token.id,
                requested: count,
                remaining: 0,
            })?;
        if count > reservation.remaining {
            return Err(LedgerError::Overdraw {
                id: token.id,
                requested: count,
                remaining: reservation.remaining,
            });
        }
        let stack = self
            .stacks
            .get_mut(&reservation.stack)
            .ok_or(LedgerError::UnknownStack(reservation.stack))?;

        stack.quantity -= count;
        stack.reserved -= count;
        if stack.quantity == 0 {
            self.stacks.remove(&reservation.stack);
        }

        let remaining = reservation.remaining - count;
        if remaining == 0 {
            self.reservations.remove(&token.id);
        } else if let Some(live) = self.reservations.get_mut(&token.id) {
            live.remaining = remaining;
        }
        self.totals.consumed += u64::from(count);
        Ok(count)
    }
}

/// Resource: Shared stockpile ledger
#[derive(Resource, Debug, Default)]
pub struct ResourceLedger {
    state: Mutex<LedgerState>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Every mutation leaves the state consistent before it can panic, so a
        // poisoned lock still guards valid data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a new stack on the ground. Returns its id.
    pub fn add_stack(&self, resource: impl Into<String>, quantity: u32, position: Position) -> StackId {
        let mut state = self.lock();
        state.next_stack += 1;
        let id = StackId(state.next_stack);
        state.stacks.insert(
            id,
            ResourceStack {
                id,
                resource: resource.into(),
                position,
                quantity,
                reserved: 0,
                forbidden: false,
            },
        );
        id
    }

    pub fn stack(&self, id: StackId) -> Option<ResourceStack> {
        self.lock().stacks.get(&id).cloned()
    }

    pub fn stacks(&self) -> Vec<ResourceStack> {
        self.lock().stacks.values().cloned().collect()
    }

    pub fn set_forbidden(&self, id: StackId, forbidden: bool) {
        if let Some(stack) = self.lock().stacks.get_mut(&id) {
            stack.forbidden = forbidden;
        }
    }

    /// Remove a stack from the world (burnt, stolen). Reservations on it go dead.
    pub fn destroy_stack(&self, id: StackId) -> Option<ResourceStack> {
        self.lock().stacks.remove(&id)
    }

    /// Total units of a resource, reserved or not
    pub fn total(&self, resource: &str) -> u32 {
        self.lock()
            .stacks
            .values()
            .filter(|s| s.resource == resource)
            .map(|s| s.quantity)
            .sum()
    }

    /// Units of a resource not promised to anyone
    pub fn unreserved(&self, resource: &str) -> u32 {
        self.lock()
            .stacks
            .values()
            .filter(|s| s.resource == resource && !s.forbidden)
            .map(|s| s.unreserved())
            .sum()
    }

    /// Plan which stacks could cover `quantity` units, nearest first.
    ///
    /// Returns `None` when the usable stacks cannot cover the request; no
    /// partial plan is ever returned.
    pub fn find_available(
        &self,
        resource: &str,
        quantity: u32,
        near: Position,
        usable: impl Fn(&ResourceStack) -> bool,
    ) -> Option<Vec<StackPick>> {
        self.lock().find(resource, quantity, near, &usable)
    }

    pub fn reserve(&self, stack: StackId, count: u32) -> Result<ReservationToken, LedgerError> {
        self.lock().reserve(stack, count)
    }

    /// Find and reserve enough units in one critical section. All or nothing.
    pub fn claim(
        &self,
        resource: &str,
        quantity: u32,
        near: Position,
        usable: impl Fn(&ResourceStack) -> bool,
    ) -> Result<Vec<ReservationToken>, LedgerError> {
        let mut state = self.lock();
        let picks = state
            .find(resource, quantity, near, &usable)
            .ok_or_else(|| LedgerError::Insufficient {
                resource: resource.to_string(),
            })?;

        let mut tokens = Vec::with_capacity(picks.len());
        for pick in picks {
            match state.reserve(pick.stack, pick.count) {
                Ok(token) => tokens.push(token),
                Err(e) => {
                    for token in &tokens {
                        state.release(token);
                    }
                    return Err(e);
                }
            }
        }
        Ok(tokens)
    }

    /// Drop whatever is left of a reservation. Releasing twice is a no-op.
    /// Returns the units that went back to the stack.
    pub fn release(&self, token: &ReservationToken) -> u32 {
        self.lock().release(token)
    }

    /// Take `count` reserved units off the stack (picked up by a worker).
    pub fn withdraw(&self, token: &ReservationToken, count: u32) -> Result<u32, LedgerError> {
        self.lock().withdraw(token, count)
    }

    /// Destroy every unit still held by the token and close it.
    pub fn consume(&self, token: &ReservationToken) -> Result<u32, LedgerError> {
        let mut state = self.lock();
        let remaining = state
            .reservations
            .get(&token.id)
            .map(|r| r.remaining)
            .unwrap_or(0);
        if remaining == 0 {
            return Ok(0);
        }
        state.withdraw(token, remaining)
    }

    /// Units the token can still withdraw; 0 once spent or released
    pub fn remaining(&self, token: &ReservationToken) -> u32 {
        self.lock()
            .reservations
            .get(&token.id)
            .map(|r| r.remaining)
            .unwrap_or(0)
    }

    pub fn totals(&self) -> LedgerTotals {
        self.lock().totals
    }

    pub fn outstanding_reservations(&self) -> usize {
        self.lock().reservations.len()
    }
}
