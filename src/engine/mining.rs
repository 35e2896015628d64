// Timed resource mining.
//
// A session starts when the interact key is held next to a rock with ore left.
// Its stages run off a task queue keyed by session id:
//
//   start ──stage_delay──▶ Extract: take one ore
//                             ├─ ore left  → session ends
//                             └─ emptied   ──success_display──▶ Release → session ends
//
// The session's existence is the locomotion lock. Sessions are never cancelled:
// once started, a session runs its stages to the end. New interact requests are
// refused while one exists.

use bevy_ecs::prelude::*;
use glam::Vec3;
use log::{info, warn};

use super::components::OreDeposit;
use super::config::MiningConfig;
use super::scene::ResourceNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningStage {
    Extracting,
    Celebrating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningSession {
    pub id: SessionId,
    pub target: Entity,
    pub stage: MiningStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningEvent {
    Started { session: SessionId, target: Entity },
    Extracted { target: Entity, remaining: u32 },
    /// Extraction stage resolved. `depleted` is true only if this session took the last ore.
    Finished { session: SessionId, depleted: bool },
    /// Session is over and locomotion is free again.
    Released { session: SessionId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageTask {
    Extract,
    Release,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTask {
    session: SessionId,
    due: f64,
    task: StageTask,
}

pub struct MiningController {
    pub interaction_radius: f32,
    pub stage_delay: f32,
    pub success_display: f32,
    clock: f64,
    next_id: u64,
    session: Option<MiningSession>,
    tasks: Vec<ScheduledTask>,
}

impl MiningController {
    pub fn new(config: &MiningConfig) -> Self {
        Self {
            interaction_radius: config.interaction_radius,
            stage_delay: config.stage_delay,
            success_display: config.success_display,
            clock: 0.0,
            next_id: 0,
            session: None,
            tasks: Vec::new(),
        }
    }

    /// True while a session holds the locomotion lock.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&MiningSession> {
        self.session.as_ref()
    }

    /// Start mining the nearest rock in reach that still has ore.
    /// Ties go to the earliest spawned rock. Returns None if a session already
    /// exists or nothing is in reach.
    pub fn try_start(&mut self, position: Vec3, nodes: &[ResourceNode]) -> Option<MiningEvent> {
        if self.session.is_some() {
            return None;
        }

        let target = nodes
            .iter()
            .filter(|n| n.remaining > 0)
            .map(|n| (n, n.position.distance(position)))
            .filter(|(_, d)| *d < self.interaction_radius)
            .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.entity.cmp(&b.entity)))
            .map(|(n, _)| n.entity)?;

        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.session = Some(MiningSession { id, target, stage: MiningStage::Extracting });
        self.schedule(id, self.clock + self.stage_delay as f64, StageTask::Extract);

        info!("Mining {:?} (session {})", target, id.0);
        Some(MiningEvent::Started { session: id, target })
    }

    /// Advance the session clock and run every stage that has come due.
    pub fn advance(&mut self, dt: f32, world: &mut World) -> Vec<MiningEvent> {
        self.clock += dt.max(0.0) as f64;

        let mut events = Vec::new();
        while let Some(index) = self.next_due() {
            let task = self.tasks.swap_remove(index);
            self.run(task, world, &mut events);
        }
        events
    }

    fn schedule(&mut self, session: SessionId, due: f64, task: StageTask) {
        self.tasks.push(ScheduledTask { session, due, task });
    }

    fn next_due(&self) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= self.clock)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due))
            .map(|(i, _)| i)
    }

    fn run(&mut self, task: ScheduledTask, world: &mut World, events: &mut Vec<MiningEvent>) {
        // Tasks outliving their session are dropped.
        let Some(session) = self.session.filter(|s| s.id == task.session) else {
            return;
        };

        match task.task {
            StageTask::Extract => {
                let extracted = world
                    .get_mut::<OreDeposit>(session.target)
                    .map(|mut ore| (ore.extract(), ore.remaining));

                match extracted {
                    Some((took, remaining)) => {
                        events.push(MiningEvent::Extracted { target: session.target, remaining });
                        let depleted = took && remaining == 0;
                        events.push(MiningEvent::Finished { session: session.id, depleted });
                        if depleted {
                            if let Some(s) = self.session.as_mut() {
                                s.stage = MiningStage::Celebrating;
                            }
                            let due = task.due + self.success_display as f64;
                            self.schedule(session.id, due, StageTask::Release);
                        } else {
                            self.end(session.id, events);
                        }
                    }
                    None => {
                        warn!("Mining target {:?} vanished, ending session", session.target);
                        events.push(MiningEvent::Finished { session: session.id, depleted: false });
                        self.end(session.id, events);
                    }
                }
            }
            StageTask::Release => self.end(session.id, events),
        }
    }

    fn end(&mut self, id: SessionId, events: &mut Vec<MiningEvent>) {
        self.session = None;
        self.tasks.retain(|t| t.session != id);
        events.push(MiningEvent::Released { session: id });
        info!("Mining session {} finished", id.0);
    }
}
