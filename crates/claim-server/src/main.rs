//! Admin console for the land-claim store.
//!
//! This binary:
//! 1. Opens (or creates) the LMDB claim store in `CLAIM_DATA_DIR`
//! 2. Rebuilds the chunk index and prunes orphaned sub-lands
//! 3. Starts the boundary poller over console-driven entity positions
//! 4. Runs the command loop, the only path that mutates claims
//!
//! Settings are read from `CLAIM_*` environment variables, e.g.
//! `CLAIM_MIN_LAND_DISTANCE=5`. Type `help` for commands.

mod commands;
mod positions;
mod settings;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use claim_land::{
    BoundaryCrossing, BoundaryPoller, ClaimConfig, ClaimError, Claims, LandId, NewSubLand,
    Presence, SharedBackend,
};
use claim_storage::LmdbBackend;
use tracing::{error, info, warn};

use crate::commands::{Command, HELP, parse_command};
use crate::positions::ConsolePositions;
use crate::settings::EnvSettings;

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("claim_server=info".parse()?)
                .add_directive("claim_land=info".parse()?),
        )
        .init();

    let data_dir = std::env::var("CLAIM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("claims"));
    info!("Claim store: {}", data_dir.display());

    let config = ClaimConfig::load(&EnvSettings::new());
    info!(
        "Min distance {}, price {}/column, refund {:.2}, min size {}",
        config.min_land_distance, config.land_price, config.refund_coefficient, config.min_land_size
    );

    let backend: SharedBackend = Arc::new(LmdbBackend::open(&data_dir)?);
    let claims = Claims::open(backend, config);

    match claims.rebuild_all() {
        Ok(report) => info!(
            "Indexed {} lands in {} dimensions ({} orphaned sub-lands pruned)",
            report.lands, report.dimensions, report.orphans_pruned
        ),
        Err(e) => error!("Startup reindex failed, lookups may miss lands until `reindex`: {e}"),
    }

    let presence = Presence::new();
    let positions = Arc::new(ConsolePositions::default());
    let (poller, crossings) =
        BoundaryPoller::new(claims.engine().clone(), presence.clone(), positions.clone());
    let poller = poller.spawn(claims.config().poll_interval)?;

    // Set up command input channel
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    thread::Builder::new()
        .name("console-input".to_owned())
        .spawn(move || input_thread(&cmd_tx))?;

    print_prompt();

    let mut running = true;
    while running {
        while let Ok(crossing) = crossings.try_recv() {
            report_crossing(&claims, crossing);
        }

        let cmd = match cmd_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(cmd) => cmd,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        match cmd {
            Command::Quit => {
                info!("Shutting down...");
                running = false;
            }
            Command::Join(entity) => {
                presence.connect(entity);
                info!("Entity {entity} connected");
            }
            Command::Leave(entity) => {
                presence.disconnect(entity);
                positions.remove(entity);
                info!("Entity {entity} disconnected");
            }
            Command::Move { entity, dimension, pos } => positions.place(entity, &dimension, pos),
            cmd => {
                if let Err(e) = run(&claims, cmd) {
                    if e.is_storage() {
                        error!("{e}");
                    } else {
                        warn!("{e}");
                    }
                }
            }
        }
        print_prompt();
    }

    if !poller.stop() {
        error!("Boundary poller exited abnormally");
    }
    Ok(())
}

fn run(claims: &Claims, cmd: Command) -> Result<(), ClaimError> {
    match cmd {
        Command::Claim { owner, dimension, bounds, name } => {
            let price = claims.quote(&bounds);
            let id = claims.create_land(owner, name, &dimension, bounds)?;
            info!("Land {id} created, price {price}");
        }
        Command::Public { dimension, bounds, name } => {
            let id = claims.create_public_land(name, &dimension, bounds)?;
            info!("Public land {id} created");
        }
        Command::Delete(id) => {
            let deleted = claims.delete_land(id)?;
            info!(
                "Land {id} deleted with {} sub-lands, refund {} to {}",
                deleted.sub_lands_removed, deleted.refund, deleted.land.owner
            );
        }
        Command::Sub { parent, owner, bounds, name } => {
            let id = claims.create_sub_land(NewSubLand {
                parent,
                owner,
                name,
                bounds,
            })?;
            info!("Sub-land {id} created in land {parent}");
        }
        Command::Resize { sub, bounds } => claims.resize_sub_land(sub, bounds)?,
        Command::DeleteSub(id) => {
            if claims.delete_sub_land(id)? {
                info!("Sub-land {id} deleted");
            } else {
                warn!("No sub-land {id}");
            }
        }
        Command::Share { land, player } => {
            claims.lands().add_shared_user(land, player.clone())?;
            info!("Land {land} shared with {player}");
        }
        Command::Flag { land, flag, enabled } => {
            let flags = claims.lands().set_flag(land, flag, enabled)?;
            info!("Land {land} flags: {flags:?}");
        }
        Command::At { dimension, x, z, y } => match claims.engine().resolve_land(&dimension, x, z, y)? {
            Some(land) => info!("({x}, {z}) in {dimension}: land {} '{}' of {}", land.id, land.name, land.owner),
            None => info!("({x}, {z}) in {dimension}: unclaimed"),
        },
        Command::List(owner) => {
            let lands = match &owner {
                Some(owner) => claims.lands().by_owner(owner)?,
                None => claims.lands().all()?,
            };
            info!("Lands ({}):", lands.len());
            for land in lands {
                info!(
                    "  {} '{}' {} {} {} shared={:?}",
                    land.id, land.name, land.owner, land.dimension, land.bounds, land.shared
                );
            }
        }
        Command::Reindex => match claims.rebuild_all() {
            Ok(report) => info!(
                "Reindexed {} lands in {} dimensions, pruned {} sub-lands",
                report.lands, report.dimensions, report.orphans_pruned
            ),
            Err(e) => error!("Reindex failed: {e}"),
        },
        Command::Audit => {
            let drift = claims.audit()?;
            if drift.is_clean() {
                info!("Chunk index matches the land table");
            } else {
                for entry in drift.missing.iter().take(20) {
                    info!("  missing land {} in {}", entry.land, entry.cell.chunk);
                }
                for entry in drift.stale.iter().take(20) {
                    info!("  stale land {} in {}", entry.land, entry.cell.chunk);
                }
                info!("Run `reindex` to repair");
            }
        }
        Command::Help => {
            info!("Commands:");
            for line in HELP {
                info!("  {line}");
            }
        }
        Command::Invalid(msg) => warn!("{msg}"),
        Command::Unknown(s) => {
            if !s.is_empty() {
                info!("Unknown command: '{s}'. Type 'help' for commands.");
            }
        }
        Command::Join(_) | Command::Leave(_) | Command::Move { .. } | Command::Quit => {}
    }
    Ok(())
}

fn report_crossing(claims: &Claims, crossing: BoundaryCrossing) {
    let describe = |land: Option<LandId>| match land {
        None => "the wild".to_owned(),
        Some(id) => match claims.lands().find(id) {
            Ok(Some(land)) => format!("land {id} '{}'", land.name),
            _ => format!("land {id}"),
        },
    };
    info!(
        "Entity {} left {} and entered {}",
        crossing.entity,
        describe(crossing.from),
        describe(crossing.to)
    );
}

fn input_thread(tx: &mpsc::Sender<Command>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let cmd = parse_command(&line);
        let is_quit = matches!(cmd, Command::Quit);
        if tx.send(cmd).is_err() || is_quit {
            return;
        }
    }
    let _ = tx.send(Command::Quit);
}

#[allow(clippy::print_stdout)]
fn print_prompt() {
    print!("> ");
    io::stdout().flush().ok();
}
