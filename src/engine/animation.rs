// Animation clip playback and the character's clip selection state machine.
//
// AnimationMixer owns one ClipAction per named clip. Each action carries a blend
// weight that fades linearly toward a target; the renderer reads the weights.
//
// AnimationStateMachine picks which clip is current:
//
//   Idle ⇄ Walking      locomotion starts/stops (only outside mining)
//   Idle/Walking → Mining     a mining session starts
//   Mining → Success     the session emptied its deposit
//   Mining → Idle        the deposit still has ore
//   Success → Idle       after the success display time
//
// Every transition fades the outgoing clip out and the incoming clip in over the
// same duration, so at rest exactly one clip carries weight.

use log::{debug, warn};

use super::config::AnimationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(usize);

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

/// One playable clip with play/reset/fade controls.
#[derive(Debug, Clone)]
pub struct ClipAction {
    name: String,
    duration: f32,
    time: f32,
    weight: f32,
    playing: bool,
    fade: Option<Fade>,
}

impl ClipAction {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration: duration.max(0.0),
            time: 0.0,
            weight: 0.0,
            playing: false,
            fade: None,
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn weight(&self) -> f32 { self.weight }

    /// Rewind to the start and cancel any fade in progress. Weight is kept so a
    /// following fade starts from wherever the clip currently is.
    pub fn reset(&mut self) -> &mut Self {
        self.time = 0.0;
        self.fade = None;
        self
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn fade_in(&mut self, duration: f32) -> &mut Self {
        self.fade_to(1.0, duration)
    }

    pub fn fade_out(&mut self, duration: f32) -> &mut Self {
        self.fade_to(0.0, duration)
    }

    fn fade_to(&mut self, target: f32, duration: f32) -> &mut Self {
        if duration <= 0.0 {
            self.weight = target;
            self.fade = None;
            if target == 0.0 {
                self.playing = false;
            }
        } else {
            self.fade = Some(Fade { from: self.weight, to: target, elapsed: 0.0, duration });
        }
        self
    }

    pub fn update(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        if self.duration > 0.0 {
            self.time = (self.time + dt).rem_euclid(self.duration);
        }
        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed += dt;
            let t = (fade.elapsed / fade.duration).min(1.0);
            self.weight = fade.from + (fade.to - fade.from) * t;
            if t >= 1.0 {
                self.weight = fade.to;
                self.fade = None;
                if self.weight == 0.0 {
                    self.playing = false;
                }
            }
        }
    }
}

/// Named clip set. Clip ids are indices handed out by `add_clip`.
#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    actions: Vec<ClipAction>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, name: impl Into<String>, duration: f32) -> ClipId {
        self.actions.push(ClipAction::new(name, duration));
        ClipId(self.actions.len() - 1)
    }

    pub fn find(&self, name: &str) -> Option<ClipId> {
        self.actions.iter().position(|a| a.name == name).map(ClipId)
    }

    pub fn first(&self) -> Option<ClipId> {
        if self.actions.is_empty() { None } else { Some(ClipId(0)) }
    }

    pub fn action(&self, id: ClipId) -> &ClipAction {
        &self.actions[id.0]
    }

    pub fn action_mut(&mut self, id: ClipId) -> &mut ClipAction {
        &mut self.actions[id.0]
    }

    pub fn actions(&self) -> impl Iterator<Item = &ClipAction> {
        self.actions.iter()
    }

    pub fn update(&mut self, dt: f32) {
        for action in &mut self.actions {
            action.update(dt);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimState {
    Idle,
    Walking,
    Mining,
    Success,
}

#[derive(Debug, Clone, Copy)]
struct ClipSlots {
    idle: ClipId,
    walk: ClipId,
    mining: ClipId,
    success: ClipId,
}

impl ClipSlots {
    fn clip_for(&self, state: AnimState) -> ClipId {
        match state {
            AnimState::Idle => self.idle,
            AnimState::Walking => self.walk,
            AnimState::Mining => self.mining,
            AnimState::Success => self.success,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Driven { slots: ClipSlots, state: AnimState },
    /// Idle or walk clip missing: whatever clip came first loops forever.
    Ambient,
}

pub struct AnimationStateMachine {
    mixer: AnimationMixer,
    mode: Mode,
    current: Option<ClipId>,
    fade: f32,
}

impl AnimationStateMachine {
    pub fn new(mut mixer: AnimationMixer, config: &AnimationConfig) -> Self {
        let fade = config.fade.max(0.0);

        let (idle, walk) = match (mixer.find(&config.idle_clip), mixer.find(&config.walk_clip)) {
            (Some(idle), Some(walk)) => (idle, walk),
            _ => {
                let current = mixer.first();
                match current {
                    Some(id) => {
                        warn!(
                            "clips `{}`/`{}` not found, looping `{}` without state machine",
                            config.idle_clip, config.walk_clip, mixer.action(id).name()
                        );
                        mixer.action_mut(id).fade_in(0.0).play();
                    }
                    None => warn!("no animation clips available"),
                }
                return Self { mixer, mode: Mode::Ambient, current, fade };
            }
        };

        let optional = |name: &str| {
            mixer.find(name).unwrap_or_else(|| {
                warn!("clip `{}` not found, using `{}` instead", name, config.idle_clip);
                idle
            })
        };
        let mining = optional(&config.mining_clip);
        let success = optional(&config.success_clip);

        mixer.action_mut(idle).fade_in(0.0).play();

        Self {
            mixer,
            mode: Mode::Driven {
                slots: ClipSlots { idle, walk, mining, success },
                state: AnimState::Idle,
            },
            current: Some(idle),
            fade,
        }
    }

    /// None in ambient mode.
    pub fn state(&self) -> Option<AnimState> {
        match self.mode {
            Mode::Driven { state, .. } => Some(state),
            Mode::Ambient => None,
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self.mode, Mode::Ambient)
    }

    pub fn current_clip_name(&self) -> Option<&str> {
        self.current.map(|id| self.mixer.action(id).name())
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    /// Switch between walk and idle. Ignored while mining or celebrating.
    pub fn set_locomotion_active(&mut self, active: bool) {
        match (self.state(), active) {
            (Some(AnimState::Idle), true) => self.enter(AnimState::Walking),
            (Some(AnimState::Walking), false) => self.enter(AnimState::Idle),
            _ => {}
        }
    }

    pub fn begin_mining(&mut self) {
        if matches!(self.state(), Some(AnimState::Idle | AnimState::Walking)) {
            self.enter(AnimState::Mining);
        }
    }

    /// The extraction stage resolved; celebrate only if it emptied the deposit.
    pub fn finish_mining(&mut self, depleted: bool) {
        if self.state() == Some(AnimState::Mining) {
            self.enter(if depleted { AnimState::Success } else { AnimState::Idle });
        }
    }

    pub fn release_success(&mut self) {
        if self.state() == Some(AnimState::Success) {
            self.enter(AnimState::Idle);
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.mixer.update(dt);
    }

    fn enter(&mut self, next: AnimState) {
        let Mode::Driven { slots, state } = &mut self.mode else {
            return;
        };
        debug!("animation {:?} -> {:?}", state, next);
        *state = next;

        let incoming = slots.clip_for(next);
        if self.current == Some(incoming) {
            return;
        }
        if let Some(outgoing) = self.current {
            self.mixer.action_mut(outgoing).fade_out(self.fade);
        }
        self.mixer.action_mut(incoming).reset().fade_in(self.fade).play();
        self.current = Some(incoming);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_mixer() -> AnimationMixer {
        let mut mixer = AnimationMixer::new();
        mixer.add_clip("Idle", 2.0);
        mixer.add_clip("Walking", 1.0);
        mixer.add_clip("Standing", 1.5);
        mixer.add_clip("ThumbsUp", 2.5);
        mixer
    }

    fn weight(sm: &AnimationStateMachine, name: &str) -> f32 {
        let id = sm.mixer().find(name).unwrap();
        sm.mixer().action(id).weight()
    }

    fn active_clips(sm: &AnimationStateMachine) -> Vec<&str> {
        sm.mixer().actions().filter(|a| a.weight() > 0.0).map(|a| a.name()).collect()
    }

    #[test]
    fn fade_moves_weight_linearly_and_stops_at_zero() {
        let mut clip = ClipAction::new("x", 1.0);
        clip.fade_in(0.0).play();
        clip.fade_out(0.2);
        clip.update(0.1);
        assert!((clip.weight() - 0.5).abs() < 1e-5);
        clip.update(0.2);
        assert_eq!(clip.weight(), 0.0);
        assert!(!clip.playing);
        assert!(clip.fade.is_none());
    }

    #[test]
    fn clip_time_loops() {
        let mut clip = ClipAction::new("x", 1.0);
        clip.play();
        clip.update(0.75);
        clip.update(0.5);
        assert!((clip.time - 0.25).abs() < 1e-5);
        clip.reset();
        assert_eq!(clip.time, 0.0);
    }

    #[test]
    fn starts_idle_with_single_clip_weighted() {
        let sm = AnimationStateMachine::new(full_mixer(), &AnimationConfig::default());
        assert_eq!(sm.state(), Some(AnimState::Idle));
        assert_eq!(sm.current_clip_name(), Some("Idle"));
        assert_eq!(active_clips(&sm), vec!["Idle"]);
    }

    #[test]
    fn walk_cross_fade_overlaps_then_resolves() {
        let mut sm = AnimationStateMachine::new(full_mixer(), &AnimationConfig::default());
        sm.set_locomotion_active(true);
        sm.update(0.1);
        assert_eq!(sm.state(), Some(AnimState::Walking));
        assert!((weight(&sm, "Idle") - 0.5).abs() < 1e-4);
        assert!((weight(&sm, "Walking") - 0.5).abs() < 1e-4);

        sm.update(0.2);
        assert_eq!(active_clips(&sm), vec!["Walking"]);
        assert_eq!(weight(&sm, "Walking"), 1.0);
    }

    #[test]
    fn flip_flop_before_fade_completes_settles_on_one_clip() {
        let mut sm = AnimationStateMachine::new(full_mixer(), &AnimationConfig::default());
        sm.set_locomotion_active(true);
        sm.update(0.05);
        sm.set_locomotion_active(false);
        sm.update(0.05);
        assert_eq!(sm.state(), Some(AnimState::Idle));

        sm.update(0.5);
        assert_eq!(sm.current_clip_name(), Some("Idle"));
        assert_eq!(active_clips(&sm), vec!["Idle"]);
        assert_eq!(weight(&sm, "Idle"), 1.0);
        let walk = sm.mixer().find("Walking").unwrap();
        assert!(!sm.mixer().action(walk).playing);
    }

    #[test]
    fn locomotion_ignored_while_mining() {
        let mut sm = AnimationStateMachine::new(full_mixer(), &AnimationConfig::default());
        sm.begin_mining();
        sm.set_locomotion_active(true);
        assert_eq!(sm.state(), Some(AnimState::Mining));
        assert_eq!(sm.current_clip_name(), Some("Standing"));
        // A second begin is a no-op
        sm.begin_mining();
        assert_eq!(sm.state(), Some(AnimState::Mining));
    }

    #[test]
    fn mining_outcomes() {
        let mut sm = AnimationStateMachine::new(full_mixer(), &AnimationConfig::default());
        sm.begin_mining();
        sm.finish_mining(false);
        assert_eq!(sm.state(), Some(AnimState::Idle));

        sm.begin_mining();
        sm.finish_mining(true);
        assert_eq!(sm.state(), Some(AnimState::Success));
        assert_eq!(sm.current_clip_name(), Some("ThumbsUp"));
        sm.release_success();
        assert_eq!(sm.state(), Some(AnimState::Idle));
        sm.update(1.0);
        assert_eq!(active_clips(&sm), vec!["Idle"]);
    }

    #[test]
    fn missing_mining_clips_fall_back_to_idle() {
        let mut mixer = AnimationMixer::new();
        mixer.add_clip("Idle", 1.0);
        mixer.add_clip("Walking", 1.0);
        let mut sm = AnimationStateMachine::new(mixer, &AnimationConfig::default());
        sm.set_locomotion_active(true);
        sm.begin_mining();
        assert_eq!(sm.state(), Some(AnimState::Mining));
        assert_eq!(sm.current_clip_name(), Some("Idle"));
        sm.finish_mining(true);
        assert_eq!(sm.state(), Some(AnimState::Success));
        assert_eq!(sm.current_clip_name(), Some("Idle"));
    }

    #[test]
    fn missing_walk_clip_selects_ambient_mode() {
        let mut mixer = AnimationMixer::new();
        mixer.add_clip("Dance", 3.0);
        mixer.add_clip("Idle", 1.0);
        let mut sm = AnimationStateMachine::new(mixer, &AnimationConfig::default());
        assert!(sm.is_ambient());
        assert_eq!(sm.state(), None);
        assert_eq!(sm.current_clip_name(), Some("Dance"));

        sm.set_locomotion_active(true);
        sm.begin_mining();
        sm.update(0.5);
        assert_eq!(sm.current_clip_name(), Some("Dance"));
        assert_eq!(active_clips(&sm), vec!["Dance"]);
    }

    #[test]
    fn empty_clip_set_is_harmless() {
        let mut sm = AnimationStateMachine::new(AnimationMixer::new(), &AnimationConfig::default());
        assert!(sm.is_ambient());
        assert_eq!(sm.current, None);
        sm.set_locomotion_active(true);
        sm.update(1.0);
    }
}
