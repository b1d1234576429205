//! The ordered chain of writer stages.

use std::io::Write;

use crate::context::TransformationContext;
use crate::error::Result;
use crate::event::Event;

/// One independent concern of the output format, e.g. the collection skeleton or the feature id.
///
/// Every hook receives the context and the rest of the chain. A stage may write before and after
/// calling [`Next::run`], or not call it at all, which ends the traversal for this event. Hooks
/// that are not overridden pass the event on unchanged.
pub trait WriterStage<W: Write> {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// Position in the chain, lower runs first. Stages with equal priority keep their
    /// registration order.
    fn priority(&self) -> i32;

    fn on_start(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        next.run(ctx)
    }

    fn on_end(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        next.run(ctx)
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        next.run(ctx)
    }

    fn on_property(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        next.run(ctx)
    }

    fn on_coordinates(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        next.run(ctx)
    }

    fn on_geometry_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        next.run(ctx)
    }
}

/// The remaining stages of the chain for the current event.
pub struct Next<'a, W: Write> {
    stages: &'a mut [Box<dyn WriterStage<W>>],
}

impl<'a, W: Write> Next<'a, W> {
    /// Number of stages that still follow.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    /// Hands the current event to the next stage. Returns immediately at the end of the chain.
    pub fn run(self, ctx: &mut TransformationContext<W>) -> Result<()> {
        let Some((stage, rest)) = self.stages.split_first_mut() else {
            return Ok(());
        };
        let next = Next { stages: rest };
        match ctx.event() {
            Event::Start => stage.on_start(ctx, next),
            Event::End => stage.on_end(ctx, next),
            Event::FeatureStart => stage.on_feature_start(ctx, next),
            Event::FeatureEnd => stage.on_feature_end(ctx, next),
            Event::Property => stage.on_property(ctx, next),
            Event::Coordinates => stage.on_coordinates(ctx, next),
            Event::GeometryEnd => stage.on_geometry_end(ctx, next),
        }
    }
}

/// Writer stages sorted by priority. The order is fixed at construction.
pub struct WriterChain<W: Write> {
    stages: Vec<Box<dyn WriterStage<W>>>,
}

impl<W: Write> WriterChain<W> {
    pub fn new(mut stages: Vec<Box<dyn WriterStage<W>>>) -> Self {
        // stable, so equal priorities keep registration order
        stages.sort_by_key(|stage| stage.priority());
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs the whole chain for the event set on `ctx`.
    pub fn dispatch(&mut self, ctx: &mut TransformationContext<W>) -> Result<()> {
        Next {
            stages: &mut self.stages,
        }
        .run(ctx)
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::*;
    use crate::json::{JsonSink, JsonWriter};
    use crate::options::EncoderOptions;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recording {
        name: &'static str,
        priority: i32,
        log: Log,
        stop: bool,
    }

    impl Recording {
        fn boxed(name: &'static str, priority: i32, log: &Log) -> Box<dyn WriterStage<Vec<u8>>> {
            Box::new(Self {
                name,
                priority,
                log: log.clone(),
                stop: false,
            })
        }
    }

    impl WriterStage<Vec<u8>> for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn on_feature_start(
            &mut self,
            ctx: &mut TransformationContext<Vec<u8>>,
            next: Next<'_, Vec<u8>>,
        ) -> Result<()> {
            self.log.borrow_mut().push(format!("{} before", self.name));
            if self.stop {
                return Ok(());
            }
            next.run(ctx)?;
            self.log.borrow_mut().push(format!("{} after", self.name));
            Ok(())
        }
    }

    fn context() -> TransformationContext<Vec<u8>> {
        let mut ctx = TransformationContext::new(
            JsonWriter::new(Vec::new()),
            Arc::new(EncoderOptions::default()),
        );
        ctx.event = Event::FeatureStart;
        ctx
    }

    #[test]
    fn sorted_by_priority() {
        let log = Log::default();
        let chain = WriterChain::new(vec![
            Recording::boxed("c", 30, &log),
            Recording::boxed("a", 10, &log),
            Recording::boxed("b", 20, &log),
        ]);
        assert_eq!(chain.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let log = Log::default();
        let first = WriterChain::new(vec![
            Recording::boxed("x", 10, &log),
            Recording::boxed("late", 50, &log),
            Recording::boxed("y", 10, &log),
        ]);
        assert_eq!(first.names(), vec!["x", "y", "late"]);

        let second = WriterChain::new(vec![
            Recording::boxed("late", 50, &log),
            Recording::boxed("x", 10, &log),
            Recording::boxed("y", 10, &log),
        ]);
        assert_eq!(second.names(), first.names());
    }

    #[test]
    fn stages_wrap_their_successors() {
        let log = Log::default();
        let mut chain = WriterChain::new(vec![
            Recording::boxed("inner", 20, &log),
            Recording::boxed("outer", 10, &log),
        ]);
        chain.dispatch(&mut context()).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["outer before", "inner before", "inner after", "outer after"]
        );
    }

    #[test]
    fn stage_can_end_traversal() {
        let log = Log::default();
        let stopping: Box<dyn WriterStage<Vec<u8>>> = Box::new(Recording {
            name: "stop",
            priority: 10,
            log: log.clone(),
            stop: true,
        });
        let mut chain = WriterChain::new(vec![stopping, Recording::boxed("never", 20, &log)]);
        chain.dispatch(&mut context()).unwrap();
        assert_eq!(*log.borrow(), vec!["stop before"]);
    }

    #[test]
    fn default_hooks_pass_through() {
        struct Writing;
        impl WriterStage<Vec<u8>> for Writing {
            fn name(&self) -> &'static str {
                "writing"
            }
            fn priority(&self) -> i32 {
                100
            }
            fn on_feature_start(
                &mut self,
                ctx: &mut TransformationContext<Vec<u8>>,
                next: Next<'_, Vec<u8>>,
            ) -> Result<()> {
                assert_eq!(next.remaining(), 0);
                ctx.json.null_value()?;
                next.run(ctx)
            }
        }
        struct Silent;
        impl WriterStage<Vec<u8>> for Silent {
            fn name(&self) -> &'static str {
                "silent"
            }
            fn priority(&self) -> i32 {
                0
            }
        }

        let mut chain = WriterChain::new(vec![Box::new(Writing), Box::new(Silent)]);
        let mut ctx = context();
        chain.dispatch(&mut ctx).unwrap();
        assert_eq!(ctx.json.get_ref().as_slice(), b"null");
    }
}
