use super::*;
use crate::test_fixtures::{
    base_content, base_state, make_rng, milk, TestAnimal, TestEnv, TestHerd,
};
use rand_chacha::ChaCha8Rng;


// --- Test helpers -------------------------------------------------------

/// Content with three-tick sessions regardless of fullness.
fn test_content() -> GameContent {
    let mut content = base_content();
    content.constants.minimum_session_ticks = 3;
    content.constants.ticks_per_fullness_unit = 0;
    content
}

fn test_state(content: &GameContent) -> SiteState {
    base_state(content)
}

fn station_id() -> StationId {
    StationId("station_0001".to_string())
}

fn animal_id(id: &str) -> AnimalId {
    AnimalId(id.to_string())
}

fn command(state: &SiteState, command: Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{:06}", state.counters.next_command_id)),
        issued_tick: state.meta.tick,
        execute_at_tick: state.meta.tick,
        command,
    }
}

fn start(state: &SiteState, animal: &str) -> CommandEnvelope {
    command(
        state,
        Command::StartSession {
            station_id: station_id(),
            animal_id: animal_id(animal),
        },
    )
}

fn dispatch(state: &SiteState, forced: bool) -> CommandEnvelope {
    command(
        state,
        Command::DispatchEmptying {
            station_id: station_id(),
            forced,
        },
    )
}

struct Harness {
    content: GameContent,
    state: SiteState,
    herd: TestHerd,
    env: TestEnv,
    rng: ChaCha8Rng,
}

impl Harness {
    fn new(animals: impl IntoIterator<Item = TestAnimal>) -> Self {
        let content = test_content();
        let state = test_state(&content);
        Self {
            content,
            state,
            herd: TestHerd::with(animals),
            env: TestEnv::default(),
            rng: make_rng(),
        }
    }

    fn station(&self) -> &Station {
        &self.state.stations[&station_id()]
    }

    fn station_mut(&mut self) -> &mut Station {
        self.state
            .stations
            .get_mut(&station_id())
            .expect("station exists")
    }

    fn tick(&mut self, commands: &[CommandEnvelope]) -> Vec<EventEnvelope> {
        tick(
            &mut self.state,
            commands,
            &mut self.herd,
            &mut self.env,
            &self.content,
            &mut self.rng,
        )
    }

    fn run(&mut self, ticks: u64) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(self.tick(&[]));
        }
        events
    }
}

fn count(events: &[EventEnvelope], pred: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| pred(&e.event)).count()
}

#[test]
fn test_tick_increments_and_event_ids_are_sequential() {
    let mut h = Harness::new([TestAnimal::new("cow_a", 0.5)]);
    let cmd = start(&h.state, "cow_a");
    let mut events = h.tick(&[cmd]);
    events.extend(h.run(2));

    assert_eq!(h.state.meta.tick, 3);
    let ids: Vec<&str> = events.iter().map(|e| e.id.0.as_str()).collect();
    assert_eq!(ids, vec!["evt_000000", "evt_000001"]);
}

#[test]
fn test_future_command_waits_for_its_tick() {
    let mut h = Harness::new([TestAnimal::new("cow_a", 0.5)]);
    let mut cmd = start(&h.state, "cow_a");
    cmd.execute_at_tick = 1;

    assert!(h.tick(std::slice::from_ref(&cmd)).is_empty());
    assert!(h.station().session.is_idle());

    let events = h.tick(&[cmd]);
    assert_eq!(count(&events, |e| matches!(e, Event::SessionStarted { .. })), 1);
}

#[test]
fn test_same_seed_same_event_stream() {
    let run = || {
        let mut animal = TestAnimal::new("cow_a", 0.5);
        animal.set_yield(7.0);
        let mut h = Harness::new([animal]);
        h.station_mut().reservoir.capacity = 1_000;
        let mut all = Vec::new();
        for _ in 0..20 {
            h.herd.get_mut("cow_a").fullness = 0.5;
            let cmd = start(&h.state, "cow_a");
            all.extend(h.tick(&[cmd]));
            all.extend(h.run(2));
        }
        serde_json::to_string(&all).unwrap()
    };
    assert_eq!(run(), run());
}
