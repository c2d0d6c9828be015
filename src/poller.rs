//! The poll cycle state machine and the driving loop around it.
//!
//! `run_cycle` is Connect → List → (Bootstrap | ProcessEach) over injected
//! collaborator traits, returning the advanced cursor; `run_loop` owns
//! sleeping, interrupt handling and the cursor persist policy. Keeping the
//! two apart lets every cycle property be tested without timers or sockets.

use tokio::sync::watch;
use tracing::{error, info};

use crate::classifier::Classifier;
use crate::config::AgentConfig;
use crate::error::CycleError;
use crate::mailbox::Mailbox;
use crate::notifier::{self, Notifier};
use crate::state::Cursor;

/// Run one full poll cycle, returning the cursor to persist.
///
/// Session teardown is guaranteed on every path. `CycleError::Connect`
/// means zero progress (the caller must not persist); `Aborted` carries the
/// cursor as far as the cycle got.
pub async fn run_cycle(
    config: &AgentConfig,
    mailbox: &dyn Mailbox,
    classifier: &Classifier,
    notifier: &dyn Notifier,
    mut cursor: Cursor,
) -> Result<Cursor, CycleError> {
    let mut session = mailbox.connect().await.map_err(CycleError::Connect)?;

    let uids = match session.uids_after(cursor.last_uid).await {
        Ok(uids) => uids,
        Err(e) => {
            session.close().await;
            return Err(CycleError::Aborted { cursor, source: e });
        }
    };

    if uids.is_empty() {
        info!(last_uid = cursor.last_uid, "No new messages");
        cursor.initialized = true;
        session.close().await;
        return Ok(cursor);
    }

    if !cursor.initialized && config.bootstrap_skip_existing {
        // First run ever: treat everything already in the mailbox as
        // backlog and baseline past it without notifying.
        if let Some(&max) = uids.last() {
            cursor.advance(max);
        }
        cursor.initialized = true;
        info!(
            skipped = uids.len(),
            baseline = cursor.last_uid,
            "Bootstrap: skipped existing messages"
        );
        session.close().await;
        return Ok(cursor);
    }

    for uid in uids {
        let message = match session.fetch(uid).await {
            Ok(message) => message,
            Err(e) => {
                session.close().await;
                return Err(CycleError::Aborted { cursor, source: e });
            }
        };

        let verdict = classifier.classify(&message).await;
        if verdict.is_match {
            let alert = notifier::format_alert(&message, &verdict.reason);
            if config.dry_run {
                info!(uid, alert = %alert, "Dry run: would send WhatsApp alert");
            } else {
                match notifier.deliver(&alert).await {
                    Ok(sid) => info!(uid, sid = %sid, "WhatsApp notification sent"),
                    Err(e) => {
                        // Absorbed: the message still counts as processed.
                        error!(uid, error = %e, "Notification delivery failed");
                    }
                }
            }
        } else {
            info!(uid, reason = %verdict.reason, "Not a job invite");
        }

        // Advance before touching the next message so a crash re-processes
        // at most the in-flight one.
        cursor.advance(uid);
    }

    cursor.initialized = true;
    session.close().await;
    Ok(cursor)
}

/// Drive cycles forever (or once), sleeping `poll_interval` between them.
///
/// The cursor is persisted after every cycle attempt except a Connect
/// failure. Cycle errors are logged and the loop keeps going; `shutdown`
/// flipping to true ends the loop cleanly, after the in-flight cycle and
/// its persist have completed.
pub async fn run_loop(
    config: &AgentConfig,
    mailbox: &dyn Mailbox,
    classifier: &Classifier,
    notifier: &dyn Notifier,
    mut cursor: Cursor,
    once: bool,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let mut persist = true;
        cursor = match run_cycle(config, mailbox, classifier, notifier, cursor.clone()).await {
            Ok(next) => next,
            Err(CycleError::Connect(e)) => {
                error!(error = %e, "Mailbox connection failed, will retry next tick");
                persist = false;
                cursor
            }
            Err(CycleError::Aborted { cursor: partial, source }) => {
                error!(error = %source, "Polling cycle aborted");
                partial
            }
        };

        if persist {
            if let Err(e) = cursor.save(&config.state_file).await {
                error!(error = %e, "Failed to persist cursor");
            }
        }

        if once {
            return;
        }
        if *shutdown.borrow() {
            info!("Interrupt received, stopping");
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = shutdown.changed() => {
                info!("Interrupt received, stopping");
                return;
            }
        }
    }
}
