//! Decoration tidying: the mascot carries one decoration off the scene.

use mochi_engine::{Behavior, BehaviorContext, BehaviorError, RunFuture, flag};

/// Removes one decoration from the scene and quips about it. Eligible only
/// while the scene has something to remove.
pub struct DecorationSweeper;

impl Behavior for DecorationSweeper {
    fn id(&self) -> &str {
        "tidy-decoration"
    }

    fn display_name(&self) -> &str {
        "Tidy up a decoration"
    }

    fn cooldown_secs(&self) -> u64 {
        300
    }

    fn can_run(&self, ctx: &BehaviorContext) -> bool {
        ctx.scene().decoration_count() > 0
    }

    fn run(&self, ctx: BehaviorContext) -> RunFuture {
        Box::pin(async move {
            // Hold the decorations flag so the host doesn't spawn or animate
            // decorations while one is being carried off.
            let token = ctx.lock(&[flag::DECORATIONS]);
            let removed = ctx.scene().remove_decoration();
            token.release();
            match removed {
                Some(name) => {
                    ctx.sound().play("pop");
                    ctx.speech()
                        .say(&format!("That {name} was getting dusty anyway."));
                    Ok(())
                }
                // The gate passed but the scene emptied before the run; the
                // run still ends cleanly, just with an error outcome.
                None => Err(BehaviorError::Failed("no decoration left to remove".into())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::recording_collaborators;
    use mochi_engine::{FlagRegistry, SceneHandle};

    #[tokio::test]
    async fn removes_a_decoration_and_quips() {
        let recorded = recording_collaborators(&["plant", "lamp"]);
        let sweeper = DecorationSweeper;
        let ctx = BehaviorContext::new(
            "tidy-decoration",
            FlagRegistry::new(),
            recorded.collab.clone(),
        );

        assert!(sweeper.can_run(&ctx));
        sweeper.run(ctx).await.unwrap();

        assert_eq!(recorded.scene.decoration_count(), 1);
        assert_eq!(*recorded.sound.0.lock().unwrap(), vec!["pop"]);
        let said = recorded.speech.0.lock().unwrap();
        assert_eq!(said.as_slice(), ["That lamp was getting dusty anyway."]);
    }

    #[tokio::test]
    async fn empty_scene_gates_off_and_errors_if_forced() {
        let recorded = recording_collaborators(&[]);
        let sweeper = DecorationSweeper;
        let ctx = BehaviorContext::new(
            "tidy-decoration",
            FlagRegistry::new(),
            recorded.collab.clone(),
        );

        assert!(!sweeper.can_run(&ctx));
        let err = sweeper.run(ctx).await.unwrap_err();
        assert!(err.to_string().contains("no decoration"));
    }

    #[tokio::test]
    async fn releases_decorations_flag() {
        let recorded = recording_collaborators(&["plant"]);
        let flags = FlagRegistry::new();
        let ctx = BehaviorContext::new("tidy-decoration", flags.clone(), recorded.collab.clone());

        DecorationSweeper.run(ctx).await.unwrap();
        assert!(flags.is_enabled(flag::DECORATIONS));
    }
}
