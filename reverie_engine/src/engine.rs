//! The engine instance: one world, one mutable overlay, one loop.
//!
//! [`Engine`] owns everything and exposes the host surface: `submit`
//! for command lines, `frame` for the render/update loop, the menu
//! actions, and the typed event bus. Per-turn ordering is strict:
//! scripted pre-command events, then the verb handler, then puzzles,
//! then scripted post-command events; scheduled events fire on ticks.

use std::collections::BTreeMap;

use anyhow::Result;
use log::{info, warn};
use reverie_data::{ActionDef, EventDef, EventTiming};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::audio::{AudioSink, MusicTheme, Preset, SoundOpts};
use crate::bus::{EngineEvent, EventBus};
use crate::command::Verb;
use crate::dispatch::{CommandOutcome, Ctx, dispatch_command};
use crate::events::{CustomAction, Hooks, TurnOutput, dispatch_action, events_matching_command, run_events, trigger_event_by_name};
use crate::game_loop::{FIXED_STEP_MS, GameLoop};
use crate::movement;
use crate::npc;
use crate::oracle::{Oracle, OracleSnapshot, sanitize_state_changes};
use crate::parser::parse;
use crate::progression;
use crate::puzzle;
use crate::render::{Renderer, Scene, SpriteInstance, resolve_color};
use crate::save;
use crate::state::GameState;
use crate::vocab::Vocabulary;
use crate::world::World;

/// Auto-save cadence: every 300 s of running logical time.
const AUTOSAVE_INTERVAL_MS: u64 = 300_000;
const AUTOSAVE_SLOT: &str = "autosave";

/// How many recent response lines are kept for oracle snapshots.
const RECENT_MESSAGE_CAP: usize = 50;

/// What one submitted command produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnReport {
    pub text: String,
    pub should_quit: bool,
    pub should_restart: bool,
}

/// A named mid-game checkpoint.
#[derive(Debug, Clone)]
pub struct SavePoint {
    pub name: String,
    pub description: String,
    pub score: u32,
    pub moves: u64,
    pub timestamp: String,
    snapshot: GameState,
}

/// Player sprite animation cursor; presentational, never saved.
#[derive(Debug, Clone, Copy, Default)]
struct AnimCursor {
    cell: usize,
    elapsed_ms: f64,
}

/// The running engine.
pub struct Engine {
    world: World,
    state: GameState,
    vocab: Vocabulary,
    hooks: Hooks,
    bus: EventBus,
    oracle: Box<dyn Oracle>,
    renderer: Option<Box<dyn Renderer>>,
    audio: Option<Box<dyn AudioSink>>,
    game_loop: GameLoop,
    recent_messages: Vec<String>,
    save_points: BTreeMap<String, SavePoint>,
    anim: AnimCursor,
    preset: Preset,
    /// True while the modal response window is open (oracle in flight);
    /// simulation ticks are suppressed, mirroring the SCI0 text window.
    text_window_open: bool,
    debug: bool,
}

impl Engine {
    /// Bring up an engine for a loaded world.
    pub fn new(world: World, oracle: Box<dyn Oracle>) -> Engine {
        let state = GameState::new(&world);
        let vocab = Vocabulary::with_world(&world.vocabulary);
        let mut engine = Engine {
            world,
            state,
            vocab,
            hooks: Hooks::default(),
            bus: EventBus::new(),
            oracle,
            renderer: None,
            audio: None,
            game_loop: GameLoop::new(),
            recent_messages: Vec::new(),
            save_points: BTreeMap::new(),
            anim: AnimCursor::default(),
            preset: Preset::default(),
            text_window_open: false,
            debug: false,
        };
        engine.register_builtin_actions();
        if let Some(theme) = engine.world.theme.clone() {
            engine.request_music(&theme);
        }
        info!("engine ready: '{}'", engine.world.title);
        engine
    }

    fn register_builtin_actions(&mut self) {
        // ending factors are adjusted through a custom action so worlds
        // can steer path alignment from scripts
        self.hooks.register_custom(
            "updateFactor",
            Box::new(|_world, state, _out, params| {
                let Some(name) = params.get("factor") else { return };
                let delta = params
                    .get("delta")
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .unwrap_or(0);
                progression::update_factor(state, name, delta);
            }),
        );
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn attach_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    pub fn attach_audio(&mut self, audio: Box<dyn AudioSink>) {
        self.audio = Some(audio);
    }

    pub fn register_custom_action(&mut self, name: &str, action: CustomAction) {
        self.hooks.register_custom(name, action);
    }

    pub fn register_event_handler(&mut self, event: EventDef) {
        self.hooks.register_event(event);
    }

    /// Drain pending host events, oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.bus.drain()
    }

    /// The opening text shown when a game starts.
    pub fn intro(&mut self) -> String {
        let mut out = TurnOutput::default();
        crate::dispatch::look::describe_room(&mut Ctx {
            world: &self.world,
            hooks: &self.hooks,
            state: &mut self.state,
            out: &mut out,
        });
        let mut text = String::new();
        if !self.world.intro.is_empty() {
            text.push_str(&self.world.intro);
            text.push_str("\n\n");
        }
        text.push_str(&out.text());
        self.finish_output(out);
        text
    }

    // ----- the player turn -----

    /// Process one line of player input and return the response.
    pub fn submit(&mut self, line: &str) -> Result<TurnReport> {
        // an open conversation intercepts bare option numbers
        if self.state.conversation.is_some()
            && let Ok(choice) = line.trim().parse::<usize>()
        {
            let mut out = TurnOutput::default();
            npc::select_option(&self.world, &self.hooks, &mut self.state, &mut out, choice)?;
            return Ok(self.finish_turn(out, CommandOutcome::handled()));
        }

        let command = match parse(line, &self.world, &mut self.state, &self.vocab) {
            Ok(command) => command,
            Err(err) => {
                let mut out = TurnOutput::default();
                out.push(err.to_string());
                return Ok(self.finish_turn(out, CommandOutcome::handled()));
            },
        };

        // after the ending, only the meta verbs still work
        if self.state.ended.is_some()
            && !matches!(
                command.verb,
                Verb::Load | Verb::Restart | Verb::Quit | Verb::Score | Verb::Help
            )
        {
            let mut out = TurnOutput::default();
            out.push("The story has ended. Load a save, restart, or quit.");
            return Ok(self.finish_turn(out, CommandOutcome::handled()));
        }

        self.state.moves += 1;
        let mut out = TurnOutput::default();

        // scripted pre-command events
        let pre = events_matching_command(&self.world, &self.hooks, &self.state, &command, EventTiming::Pre);
        let scripted_matched = !pre.is_empty();
        let prevented = run_events(&self.world, &self.hooks, &mut self.state, &mut out, &pre)?;

        // the verb handler, unless a script claimed the turn
        let mut outcome = if prevented {
            CommandOutcome::handled()
        } else {
            let mut ctx = Ctx {
                world: &self.world,
                hooks: &self.hooks,
                state: &mut self.state,
                out: &mut out,
            };
            dispatch_command(&mut ctx, &command)?
        };

        // puzzles see the command after the handler
        if puzzle::handle_command(&self.world, &self.hooks, &mut self.state, &mut out, &command)? {
            outcome.handled = true;
        }

        // scripted post-command events
        let post = events_matching_command(&self.world, &self.hooks, &self.state, &command, EventTiming::Post);
        run_events(&self.world, &self.hooks, &mut self.state, &mut out, &post)?;

        // dynamic fallback, only when nothing scripted or handled spoke
        if !scripted_matched && !outcome.handled {
            self.consult_oracle(&command, &mut out)?;
        }

        progression::check_achievements(&self.world, &mut self.state, &mut out);
        progression::check_completion(&self.world, &mut self.state, &mut out);

        if outcome.advance_tick {
            self.fixed_update(&mut out)?;
        }

        Ok(self.finish_turn(out, outcome))
    }

    fn consult_oracle(&mut self, command: &crate::command::Command, out: &mut TurnOutput) -> Result<()> {
        let snapshot = OracleSnapshot::capture(&self.world, &self.state, &self.recent_messages);
        // the modal text window pauses simulation until the reply lands
        self.text_window_open = true;
        let reply = self.oracle.process_command(command, &snapshot);
        self.text_window_open = false;

        match reply {
            Ok(reply) => {
                let changes = sanitize_state_changes(&self.world, &self.state, reply.state_changes);
                for action in &changes {
                    dispatch_action(&self.world, &self.hooks, &mut self.state, out, action, 0)?;
                }
                out.push(reply.text);
                if let Some(cue) = reply.audio {
                    out.sounds.push(cue);
                }
            },
            Err(err) => {
                warn!("oracle failed: {err}");
                out.push("Nothing happens.");
            },
        }
        Ok(())
    }

    /// Flush a turn's output into the bus/audio and build the report.
    fn finish_turn(&mut self, out: TurnOutput, outcome: CommandOutcome) -> TurnReport {
        let text = out.text();
        self.finish_output(out);
        if !text.is_empty() {
            self.bus.publish(EngineEvent::GameMessage { text: text.clone() });
            self.recent_messages.push(text.clone());
            if self.recent_messages.len() > RECENT_MESSAGE_CAP {
                self.recent_messages.remove(0);
            }
        }
        TurnReport {
            text,
            should_quit: outcome.should_quit,
            should_restart: outcome.should_restart,
        }
    }

    fn finish_output(&mut self, out: TurnOutput) {
        for event in out.events {
            self.bus.publish(event);
        }
        if let Some(audio) = self.audio.as_mut() {
            for sound in &out.sounds {
                audio.play_sound(sound, SoundOpts::default());
            }
        }
        for theme in &out.music {
            self.request_music(theme);
        }
    }

    fn request_music(&mut self, theme: &str) {
        let Some(audio) = self.audio.as_mut() else { return };
        match MusicTheme::from_name(theme) {
            Some(theme) => audio.play_music(theme, self.preset),
            None => warn!("unknown music theme '{theme}' requested"),
        }
    }

    // ----- the loop -----

    /// Drive one wall-clock frame: a whole number of fixed updates plus
    /// an interpolated render.
    pub fn frame(&mut self, now_ms: u64) -> Result<()> {
        let advance = self.game_loop.advance(now_ms);
        if !self.text_window_open {
            let mut out = TurnOutput::default();
            for _ in 0..advance.steps {
                self.fixed_update(&mut out)?;
            }
            let text = out.text();
            self.finish_output(out);
            if !text.is_empty() {
                self.bus.publish(EngineEvent::GameMessage { text: text.clone() });
                self.recent_messages.push(text);
            }
        }
        self.render(advance.alpha);
        if let Some(fps) = advance.fps {
            self.bus.publish(EngineEvent::GameFps { fps });
        }
        Ok(())
    }

    /// One fixed simulation step.
    fn fixed_update(&mut self, out: &mut TurnOutput) -> Result<()> {
        self.state.tick_count += 1;
        // 60 Hz exactly: tick * 50/3 ms, integer arithmetic
        self.state.clock_ms = self.state.tick_count * 50 / 3;
        let now = self.state.clock_ms;

        // scheduled events due this tick, in order
        while let Some(event) = self.state.scheduler.pop_due(now) {
            let note = event.note.as_deref().unwrap_or("<unnamed>").to_string();
            info!("scheduled event \"{note}\" firing");
            for action in event.actions {
                dispatch_action(&self.world, &self.hooks, &mut self.state, out, &action, 0)?;
            }
        }

        movement::step_npc_patterns(&mut self.state);
        npc::tick_schedules(&self.world, &mut self.state, out);
        movement::step_walk(&self.world, &mut self.state);
        self.advance_animation();

        // auto-save runs on the logical clock while a game is active
        if self.state.ended.is_none() && now.saturating_sub(self.state.last_autosave_ms) >= AUTOSAVE_INTERVAL_MS {
            self.state.last_autosave_ms = now;
            if let Err(err) = save::write_slot(&self.world, &self.state, AUTOSAVE_SLOT) {
                warn!("autosave failed: {err}");
            }
        }

        progression::check_completion(&self.world, &mut self.state, out);
        Ok(())
    }

    fn advance_animation(&mut self) {
        let Some(sprite) = &self.world.player.sprite else { return };
        let loop_name = movement::walk_loop(&self.state);
        let Some(walk_loop) = sprite.loops.iter().find(|l| l.name == loop_name) else {
            return;
        };
        if walk_loop.cells.is_empty() {
            return;
        }
        self.anim.elapsed_ms += FIXED_STEP_MS;
        #[allow(clippy::cast_precision_loss)]
        let duration = walk_loop.cells[self.anim.cell % walk_loop.cells.len()].duration_ms as f64;
        if self.anim.elapsed_ms >= duration {
            self.anim.elapsed_ms -= duration;
            self.anim.cell = (self.anim.cell + 1) % walk_loop.cells.len();
        }
    }

    fn render(&mut self, alpha: f64) {
        let Some(renderer) = self.renderer.as_mut() else { return };
        let room = self.world.rooms.get(&self.state.current_room);
        let graphics = room.and_then(|r| r.graphics.clone());
        let background_color = graphics
            .as_ref()
            .and_then(|g| g.background_color.as_deref())
            .map_or(0, resolve_color);
        let mut scene = Scene {
            room_id: self.state.current_room.clone(),
            background_color,
            graphics,
            sprites: vec![SpriteInstance {
                x: self.state.player_x,
                y: self.state.player_y,
                current_loop: movement::walk_loop(&self.state).to_string(),
                current_cell: self.anim.cell,
                mirrored: false,
                scale: 1.0,
                effect_mask: 0,
                visible: true,
                priority: None,
            }],
        };
        scene.sort_sprites();
        renderer.render(&scene, alpha);
    }

    // ----- host menu surface -----

    /// Start a fresh run of the same world.
    pub fn new_game(&mut self) -> String {
        self.state = GameState::new(&self.world);
        self.recent_messages.clear();
        self.anim = AnimCursor::default();
        if let Some(theme) = self.world.theme.clone() {
            self.request_music(&theme);
        }
        info!("new game started");
        self.intro()
    }

    pub fn set_speed(&mut self, speed: u8) {
        self.game_loop.set_speed(speed);
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.game_loop.toggle_pause()
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    pub fn set_volume(&mut self, channel: &str, level: f32) {
        if let Some(audio) = self.audio.as_mut() {
            audio.set_volume(channel, level.clamp(0.0, 1.0));
        }
    }

    /// Save to a named slot through the menu.
    pub fn menu_save(&mut self, slot: &str) -> Result<(), save::SaveError> {
        save::write_slot(&self.world, &self.state, slot).map(|_| ())
    }

    /// Load a named slot through the menu; state is untouched on error.
    pub fn menu_load(&mut self, slot: &str) -> Result<(), save::SaveError> {
        let loaded = save::read_slot(&self.world, slot)?;
        self.state = loaded;
        Ok(())
    }

    // ----- scripted-event surface -----

    /// Fire a named scripted event imperatively.
    pub fn trigger_event(&mut self, name: &str) -> Result<()> {
        let mut out = TurnOutput::default();
        trigger_event_by_name(&self.world, &self.hooks, &mut self.state, &mut out, name)?;
        let text = out.text();
        self.finish_output(out);
        if !text.is_empty() {
            self.bus.publish(EngineEvent::GameMessage { text });
        }
        Ok(())
    }

    /// Install a scripted movement pattern for an NPC.
    pub fn set_npc_movement(&mut self, npc_id: &str, steps: Vec<crate::state::PatternStep>) {
        movement::set_npc_movement(&mut self.state, npc_id, steps);
    }

    /// Begin an in-room walk toward a screen position. Replaces any
    /// walk in progress.
    pub fn move_player_to(&mut self, x: f64, y: f64) {
        movement::move_player_to(&mut self.state, x, y);
    }

    /// Walk room-to-room toward a target, stopping at the first blocked
    /// step. Returns the rooms actually entered.
    pub fn auto_navigate(&mut self, target_room: &str) -> Vec<String> {
        let mut out = TurnOutput::default();
        let entered = movement::auto_navigate(&self.world, &mut self.state, &mut out, target_room);
        let text = out.text();
        self.finish_output(out);
        if !text.is_empty() {
            self.bus.publish(EngineEvent::GameMessage { text });
        }
        entered
    }

    /// Schedule actions after a logical-time delay. Returns the id.
    pub fn schedule_event(&mut self, delay_ms: u64, actions: Vec<ActionDef>, note: Option<String>) -> u64 {
        self.state
            .scheduler
            .schedule_in(self.state.clock_ms, delay_ms, actions, note)
    }

    pub fn cancel_scheduled_event(&mut self, id: u64) -> bool {
        self.state.scheduler.cancel(id)
    }

    // ----- save points -----

    /// Capture a named checkpoint of the full overlay.
    pub fn create_save_point(&mut self, name: &str, description: &str) {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        self.save_points.insert(
            name.to_string(),
            SavePoint {
                name: name.to_string(),
                description: description.to_string(),
                score: self.state.score,
                moves: self.state.moves,
                timestamp,
                snapshot: self.state.clone(),
            },
        );
        info!("save point '{name}' created");
    }

    /// Restore a checkpoint. Returns false if the name is unknown.
    pub fn restore_save_point(&mut self, name: &str) -> bool {
        if let Some(point) = self.save_points.get(name) {
            self.state = point.snapshot.clone();
            info!("save point '{name}' restored");
            true
        } else {
            false
        }
    }

    pub fn save_points(&self) -> impl Iterator<Item = &SavePoint> {
        self.save_points.values()
    }

    /// Direct parser access, mainly for tests and tooling.
    pub fn parse_only(&mut self, line: &str) -> Result<crate::command::Command, crate::parser::ParseError> {
        parse(line, &self.world, &mut self.state, &self.vocab)
    }

    /// Expose verb help to the host (menu surface).
    pub fn verb_help(verb: Verb) -> &'static str {
        verb.help_line()
    }
}
