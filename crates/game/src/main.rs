//! Squad Rush headless driver: plays one run on autopilot and folds the
//! result into the save file.
//!
//! Usage: `squad-rush [--stage N] [--endless] [--seed N] [--buy UPGRADE]... [--max-seconds S]`

use std::path::Path;

use anyhow::{bail, Context, Result};
use audio::{LogSink, ThrottledSink};
use game::balance::UpgradeKind;
use game::gate::Side;
use game::pickup::PickupKind;
use game::{Balance, FileSlot, RunController, RunMode, RunSettings, RunSnapshot, SaveData, SimEvent};

/// Host frame step.
const FRAME_DT: f32 = 1.0 / 60.0;
/// Seconds between HUD log lines.
const HUD_INTERVAL: f32 = 5.0;
/// Only react to gates this far above the squad row.
const GATE_LOOKAHEAD: f32 = 260.0;

struct Args {
    stage: Option<u32>,
    endless: bool,
    seed: Option<u64>,
    buy: Vec<UpgradeKind>,
    max_seconds: f32,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        stage: None,
        endless: false,
        seed: None,
        buy: Vec::new(),
        max_seconds: 900.0,
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "--stage" => args.stage = Some(value()?.parse().context("--stage")?),
            "--seed" => args.seed = Some(value()?.parse().context("--seed")?),
            "--buy" => args.buy.push(value()?.parse()?),
            "--max-seconds" => args.max_seconds = value()?.parse().context("--max-seconds")?,
            "--endless" => args.endless = true,
            other => bail!("unknown argument {:?}", other),
        }
    }
    Ok(args)
}

/// `balance.ron` next to the config, or the built-in tables.
fn load_balance(path: &Path) -> Result<Balance> {
    match std::fs::read_to_string(path) {
        Ok(text) => Balance::from_ron(&text).with_context(|| format!("loading {}", path.display())),
        Err(_) => Ok(Balance::default()),
    }
}

/// Steer toward the better side of the next gate, else the nearest item.
fn autopilot(snap: &RunSnapshot) -> f32 {
    let field = snap.field;
    let squad_y = snap.squad.y;
    let size = snap.squad_size();

    let next_gate = snap
        .gates
        .iter()
        .filter(|g| g.chosen.is_none() && g.y < squad_y && squad_y - g.y < GATE_LOOKAHEAD)
        .max_by(|a, b| a.y.total_cmp(&b.y));
    if let Some(g) = next_gate {
        let side = if g.left.score(size) >= g.right.score(size) {
            Side::Left
        } else {
            Side::Right
        };
        let quarter = field.road_width() * 0.25;
        return match side {
            Side::Left => field.road_center() - quarter,
            Side::Right => field.road_center() + quarter,
        };
    }

    let anchor = snap.squad.anchor();
    snap.pickups
        .iter()
        .filter(|p| p.is_stealable() && p.pos.y < squad_y)
        .filter(|p| matches!(p.kind, PickupKind::Item(_)))
        .min_by(|a, b| a.pos.distance_squared(anchor).total_cmp(&b.pos.distance_squared(anchor)))
        .map(|p| p.pos.x)
        .unwrap_or_else(|| field.road_center())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let mut settings = RunSettings::load();
    if args.endless {
        settings.mode = RunMode::Endless;
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }

    let mut slot = FileSlot::default_location();
    let mut save = SaveData::load(&slot).context("reading save")?;
    let balance = load_balance(Path::new("balance.ron"))?;

    for kind in &args.buy {
        match save.purchase_upgrade(*kind, &balance) {
            Ok(level) => log::info!("bought {:?} level {}, {} gold left", kind, level, save.gold),
            Err(e) => log::warn!("could not buy {:?}: {}", kind, e),
        }
    }

    let wanted = args.stage.unwrap_or(settings.stage);
    settings.stage = wanted.clamp(1, save.unlocked_stage());
    if settings.stage != wanted {
        log::warn!("stage {} is locked, playing stage {}", wanted, settings.stage);
    }

    let upgrades = save.upgrade_effects(&balance);
    let cues = Box::new(ThrottledSink::new(LogSink, 0.05));
    let mut run = RunController::new(settings, balance, upgrades, cues)?;

    let mut sim_time = 0.0;
    let mut next_hud = 0.0;
    while !run.is_finished() {
        let target = autopilot(&run.snapshot());
        run.steer(target);
        run.tick(FRAME_DT);
        sim_time += FRAME_DT;

        for event in run.drain_events() {
            match event {
                SimEvent::GatePassed { side, op, gamble } => {
                    log::info!("gate {:?}: {} {:?}", side, op.label(), gamble)
                }
                SimEvent::BossSpawned { kind } => log::info!("boss incoming: {}", kind.name()),
                SimEvent::BossPhase { phase } => log::info!("boss phase {}", phase + 1),
                SimEvent::Combo { count, bonus_gold } => log::debug!("combo x{} (+{} gold)", count, bonus_gold),
                other => log::trace!("{:?}", other),
            }
        }

        if sim_time >= next_hud {
            next_hud += HUD_INTERVAL;
            log::info!("{}", run.snapshot().hud_line());
        }
        if sim_time >= args.max_seconds {
            log::warn!("time limit of {}s reached", args.max_seconds);
            run.abort();
        }
    }

    let result = run.result().cloned().context("finished run has no result")?;
    let unlocked = save.apply_run_result(&result);
    save.store(&mut slot).context("writing save")?;

    println!("{}", if result.cleared { "STAGE CLEARED" } else { "SQUAD LOST" });
    println!("  stage        {}", result.stage);
    println!("  stars        {}", "*".repeat(result.stars as usize));
    println!("  kills        {}", result.kills);
    println!("  gold         {} (bank {})", result.gold, save.gold);
    println!("  squad        {} / peak {}", result.final_squad_size, result.max_squad_size);
    println!("  max combo    {}", result.max_combo);
    println!("  time         {:.1}s", result.elapsed);
    if result.mode == RunMode::Endless {
        println!("  cycles       {}", result.cycles);
    }
    if unlocked {
        println!("  stage {} unlocked", save.unlocked_stage());
    }
    Ok(())
}
