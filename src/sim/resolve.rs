//! Bin resolution and cleanup
//!
//! Two triggers end a token's flight: the bottom sensor reporting a contact,
//! and the periodic sweep for tokens that slipped below the fallback line.
//! Both land in [`PlinkoEngine::resolve_token`], which is a no-op for a body
//! that is already gone.

use chrono::Utc;
use rand::Rng;

use super::board::BoardLayout;
use super::engine::{Celebration, EngineEvent, PlinkoEngine};
use super::physics::{BodyHandle, PhysicsWorld};
use crate::consts::TOKEN_CATEGORY;
use crate::prizes::{GameStore, LandingRecord, PrizeBin};

/// Prize for a bin, or the unknown placeholder when the table has no entry
pub fn prize_for_bin(bins: &[PrizeBin], bin: usize) -> PrizeBin {
    match bins.get(bin) {
        Some(prize) => prize.clone(),
        None => {
            log::warn!(
                "No prize configured for bin {} ({} bins known), using placeholder",
                bin,
                bins.len()
            );
            PrizeBin::unknown()
        }
    }
}

/// Build the landing record for a token that came to rest at `x`
pub fn landing_record<R: Rng + ?Sized>(
    layout: &BoardLayout,
    bins: &[PrizeBin],
    x: f32,
    rng: &mut R,
) -> LandingRecord {
    let bin_index = layout.calculate_bin_index(x);
    LandingRecord {
        id: uuid::Builder::from_random_bytes(rng.random()).into_uuid(),
        timestamp: Utc::now(),
        bin_index,
        prize: prize_for_bin(bins, bin_index),
        column_count: layout.columns,
        landing_x: x,
    }
}

impl<W: PhysicsWorld, S: GameStore> PlinkoEngine<W, S> {
    /// Resolve a token into its bin: record the landing, remove the body,
    /// unblock the next drop and drop the token's collision handler.
    ///
    /// Returns `None` without side effects if the body is already gone or is
    /// not a token.
    pub fn resolve_token(&mut self, token: BodyHandle) -> Option<LandingRecord> {
        let Some(body) = self.world.body(token) else {
            log::debug!("Token {:?} already resolved", token);
            return None;
        };
        if body.filter.category != TOKEN_CATEGORY {
            return None;
        }
        let x = body.position.x;

        let record = landing_record(&self.layout, self.store.prize_bins(), x, &mut self.rng);
        self.world.remove_body(token);
        self.controller.release(&mut self.router, token);

        log::info!(
            "Token {:?} landed in bin {} ({}, {}) at x={:.1}",
            token,
            record.bin_index,
            record.prize.name,
            record.prize.tier.as_str(),
            x
        );
        self.store.append_record(record.clone());
        self.events.push(EngineEvent::TokenLanded {
            celebration: Celebration::for_tier(&record.prize.tier),
            record: record.clone(),
        });
        Some(record)
    }

    /// Resolve every token whose center is below the fallback line.
    /// Returns how many were resolved.
    pub fn sweep_landed_tokens(&mut self) -> usize {
        let fallback_y = self.layout.fallback_y;
        let landed: Vec<BodyHandle> = self
            .world
            .handles()
            .into_iter()
            .filter(|&h| {
                self.world
                    .body(h)
                    .is_some_and(|b| b.filter.category == TOKEN_CATEGORY && b.position.y > fallback_y)
            })
            .collect();

        landed
            .into_iter()
            .filter(|&h| {
                log::debug!("Fallback sweep resolving token {:?}", h);
                self.resolve_token(h).is_some()
            })
            .count()
    }
}
