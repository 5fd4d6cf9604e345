//! Event triggering and resolution.
//!
//! Effects run against a snapshot. A failed or malformed result is discarded
//! and the snapshot stays in place, so an event either applies completely or
//! not at all.
use crate::config::GameConfig;
use crate::constants::MSG_EVENT_FAILED;
use crate::dice::Dice;
use crate::modifiers::DamageCategory;
use crate::notify::{Notice, Notices};
use crate::numbers::scale_i32;
use crate::state::GameState;
use crate::systems;
use crate::verdict;

use super::{
    Event, EventDeck, EventDraw, EventEffect, EventError, EventPool, InteractiveError,
    InteractivePrompt, PendingInteractive,
};

/// Roll for an event this turn and resolve (or suspend on) whatever is drawn.
pub fn trigger_event(
    state: &mut GameState,
    deck: &EventDeck,
    config: &GameConfig,
    dice: &mut dyn Dice,
    notices: &mut Notices,
) -> EventDraw {
    let chance_roll = dice.roll();
    let mut draw = EventDraw {
        chance_roll,
        threshold: config.event_chance,
        pool_roll: None,
        pool: None,
        candidates: 0,
        chosen: None,
    };
    if chance_roll >= config.event_chance {
        return draw;
    }

    let pool_roll = dice.roll();
    let pool = if pool_roll < config.positive_event_probability {
        EventPool::Positive
    } else {
        EventPool::Negative
    };
    draw.pool_roll = Some(pool_roll);
    draw.pool = Some(pool);

    let candidates: Vec<&Event> = deck.pool(pool).collect();
    draw.candidates = candidates.len();
    if candidates.is_empty() {
        log::debug!("{pool:?} event pool is empty; skipping event");
        return draw;
    }
    let event = *candidates[dice.pick(candidates.len())];

    // An interactive draw with too few eligible systems counts as no event.
    let interactive = match event.effect {
        EventEffect::Interactive { prompt, .. } => {
            let eligible = prompt.eligibility.filter(state);
            if eligible.len() < prompt.min_selections.max(1) {
                log::debug!(
                    "{} has no eligible systems; treating the draw as no event",
                    event.description
                );
                return draw;
            }
            Some((prompt, eligible))
        }
        EventEffect::Immediate(_) => None,
    };

    draw.chosen = Some(event.description.to_string());
    log::info!("event drawn: {}", event.description);
    notices.push(Notice::EventFired {
        description: event.description.to_string(),
        is_positive: event.is_positive,
    });

    if let Some((prompt, eligible)) = interactive {
        begin_interactive(state, &event, prompt, eligible, notices);
    } else if let EventEffect::Immediate(apply) = event.effect {
        let snapshot = state.clone();
        let result = apply(&snapshot, dice);
        commit(state, &snapshot, &event, result);
    }
    draw
}

fn begin_interactive(
    state: &mut GameState,
    event: &Event,
    prompt: InteractivePrompt,
    eligible: Vec<String>,
    notices: &mut Notices,
) {
    let pending = PendingInteractive {
        description: event.description.to_string(),
        is_positive: event.is_positive,
        prompt: prompt.text.to_string(),
        eligible: eligible.clone(),
        min_selections: prompt.min_selections,
        max_selections: prompt.max_selections.min(eligible.len()),
    };
    state.interactive_mode = true;
    state.message = pending.prompt.clone();
    state.pending_interactive = Some(pending.clone());
    notices.push(Notice::InteractivePending { pending });
    notices.push(Notice::SelectionModeEntered { eligible });
}

fn exit_interactive(state: &mut GameState, notices: &mut Notices) {
    state.interactive_mode = false;
    state.pending_interactive = None;
    notices.push(Notice::SelectionModeExited);
}

/// Resolve the pending interactive event with the player's selection.
///
/// # Errors
///
/// Returns `InteractiveError` when nothing is pending or the selection is invalid;
/// the pending event stays in place so the player can choose again.
pub fn confirm_interactive(
    state: &mut GameState,
    deck: &EventDeck,
    choice: &[String],
    notices: &mut Notices,
) -> Result<(), InteractiveError> {
    let Some(pending) = state.pending_interactive.clone() else {
        return Err(InteractiveError::NothingPending);
    };
    validate_choice(&pending, choice)?;

    exit_interactive(state, notices);
    let event = deck
        .find(&pending.description)
        .filter(|event| event.is_interactive())
        .copied();
    let Some(event) = event else {
        log::warn!("pending event `{}` is not in the deck", pending.description);
        MSG_EVENT_FAILED.clone_into(&mut state.message);
        return Ok(());
    };
    let EventEffect::Interactive { resolve, .. } = event.effect else {
        return Ok(());
    };
    let snapshot = state.clone();
    let result = resolve(&snapshot, choice);
    commit(state, &snapshot, &event, result);
    Ok(())
}

/// Decline the pending interactive event.
///
/// # Errors
///
/// Negative events can never be declined; positive ones only when the config allows it.
pub fn cancel_interactive(
    state: &mut GameState,
    config: &GameConfig,
    notices: &mut Notices,
) -> Result<(), InteractiveError> {
    let Some(pending) = state.pending_interactive.as_ref() else {
        return Err(InteractiveError::NothingPending);
    };
    if !pending.is_positive {
        return Err(InteractiveError::CancelNegative);
    }
    if !config.allow_cancel_positive_interactive {
        return Err(InteractiveError::CancelNotAllowed);
    }
    let description = pending.description.clone();
    exit_interactive(state, notices);
    state.message = format!("You passed on the {description}.");
    Ok(())
}

fn validate_choice(pending: &PendingInteractive, choice: &[String]) -> Result<(), InteractiveError> {
    let got = choice.len();
    if got < pending.min_selections || got > pending.max_selections {
        return Err(InteractiveError::SelectionCount {
            min: pending.min_selections,
            max: pending.max_selections,
            got,
        });
    }
    for (position, name) in choice.iter().enumerate() {
        if !pending.eligible.contains(name) || choice[..position].contains(name) {
            return Err(InteractiveError::IneligibleChoice(name.clone()));
        }
    }
    Ok(())
}

/// Validate and post-process an event result, or roll back to `snapshot`.
fn commit(
    state: &mut GameState,
    snapshot: &GameState,
    event: &Event,
    result: Result<GameState, EventError>,
) {
    let checked = result.and_then(|next| {
        if same_layout(snapshot, &next) {
            Ok(next)
        } else {
            Err(EventError::Malformed(event.description.to_string()))
        }
    });
    let mut next = match checked {
        Ok(next) => next,
        Err(err) => {
            log::warn!("event `{}` rolled back: {err}", event.description);
            *state = snapshot.clone();
            MSG_EVENT_FAILED.clone_into(&mut state.message);
            return;
        }
    };

    // Bookkeeping fields belong to the sequencer.
    next.turn = snapshot.turn;
    next.max_turns = snapshot.max_turns;
    next.deterioration_count = snapshot.deterioration_count;
    next.game_over = snapshot.game_over;
    next.win = snapshot.win;
    next.interactive_mode = snapshot.interactive_mode;
    next.pending_interactive.clone_from(&snapshot.pending_interactive);
    next.extensions.clone_from(&snapshot.extensions);
    next.clamp_health();

    if !event.is_positive {
        apply_negative_event_protection(snapshot, &mut next);
    }
    verdict::settle(&mut next);
    for idx in 0..next.systems.len() {
        systems::on_event(&mut next, idx, event, snapshot);
    }
    let destroyed: Vec<String> = snapshot
        .systems
        .iter()
        .zip(&next.systems)
        .filter(|(before, after)| before.is_alive() && after.is_dead())
        .map(|(_, after)| after.name.clone())
        .collect();
    for name in &destroyed {
        log::info!("{name} was destroyed by {}", event.description);
        next.modifiers.remove_by_target(name);
    }
    *state = next;
}

fn same_layout(before: &GameState, after: &GameState) -> bool {
    before.systems.len() == after.systems.len()
        && before
            .systems
            .iter()
            .zip(&after.systems)
            .all(|(a, b)| a.name == b.name && a.behavior == b.behavior)
}

/// Scale negative-event losses through the ledger as it stood before the event.
fn apply_negative_event_protection(snapshot: &GameState, next: &mut GameState) {
    for (before, after) in snapshot.systems.iter().zip(next.systems.iter_mut()) {
        let lost = before.health - after.health;
        if lost <= 0 {
            continue;
        }
        let factor = snapshot
            .modifiers
            .effective_factor(&before.name, DamageCategory::NegativeEvents);
        if factor >= 1.0 {
            continue;
        }
        let kept = scale_i32(lost, factor);
        after.set_health(before.health - kept);
    }
}
