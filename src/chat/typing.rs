use std::time::Duration;

use rand::Rng;

use super::{lock, Cancelled, SharedPanel, Target};

/// `base - 10 + jitter` milliseconds, never negative.
pub fn tick_delay(base_ms: u64, jitter_ms: u64) -> Duration {
    let ms = (base_ms as i64 - 10 + jitter_ms as i64).max(0);
    Duration::from_millis(ms as u64)
}

/// Reveals `text` into `target` one character per tick. The target is
/// cleared first. `on_complete` runs exactly once, right after the last tick,
/// unless the run owning `generation` is superseded first.
pub async fn type_text<R, F>(
    panel: &SharedPanel,
    generation: u64,
    target: Target,
    text: &str,
    base_delay_ms: u64,
    rng: &mut R,
    on_complete: F,
) -> Result<(), Cancelled>
where
    R: Rng,
    F: FnOnce(),
{
    write(panel, generation, target, |s| s.clear())?;

    for c in text.chars() {
        write(panel, generation, target, |s| s.push(c))?;
        let delay = tick_delay(base_delay_ms, rng.gen_range(0..20));
        tokio::time::sleep(delay).await;
    }

    // a stale run may have slept through a reset
    if lock(panel).generation() != generation {
        return Err(Cancelled);
    }
    on_complete();
    Ok(())
}

fn write(
    panel: &SharedPanel,
    generation: u64,
    target: Target,
    f: impl FnOnce(&mut String),
) -> Result<(), Cancelled> {
    let mut p = lock(panel);
    if p.generation() != generation {
        return Err(Cancelled);
    }
    match p.text_mut(target) {
        Some(s) => {
            f(s);
            Ok(())
        }
        None => Err(Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{shared_panel, ChatItem};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delay_is_clamped_at_zero() {
        assert_eq!(tick_delay(0, 0), Duration::ZERO);
        assert_eq!(tick_delay(0, 19), Duration::from_millis(9));
        assert_eq!(tick_delay(50, 0), Duration::from_millis(40));
        assert_eq!(tick_delay(50, 19), Duration::from_millis(59));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_completes_immediately() {
        let panel = shared_panel();
        let generation = lock(&panel).reset();
        let mut rng = StdRng::seed_from_u64(7);
        let mut calls = 0;
        let start = tokio::time::Instant::now();
        type_text(&panel, generation, Target::Title, "", 50, &mut rng, || calls += 1)
            .await
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn long_text_appears_in_order_then_completes_once() {
        let panel = shared_panel();
        let generation = {
            let mut p = lock(&panel);
            let g = p.reset();
            p.items.push(ChatItem::Message("stale".into()));
            g
        };
        let text = "Consider a 4th bedroom to widen the buyer pool 🏡";
        let mut rng = StdRng::seed_from_u64(1);
        let mut calls = 0;
        type_text(&panel, generation, Target::Item(0), text, 50, &mut rng, || calls += 1)
            .await
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(lock(&panel).items[0], ChatItem::Message(text.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_run_stops_without_completing() {
        let panel = shared_panel();
        let generation = lock(&panel).reset();
        let other = panel.clone();
        let mut calls = 0;
        let typing = async {
            let mut rng = StdRng::seed_from_u64(3);
            let text = "abcdefghij";
            type_text(&panel, generation, Target::Title, text, 50, &mut rng, || calls += 1).await
        };
        let interrupt = async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            lock(&other).reset();
        };
        let (result, _) = tokio::join!(typing, interrupt);
        assert_eq!(result, Err(Cancelled));
        assert_eq!(calls, 0);
        assert_eq!(lock(&panel).title, "");
    }
}
