//! End-to-end scenarios driving the scheduler through the host lifecycle

use pico_command::command::Lambda;
use pico_command::group::{Race, Sequential};
use pico_command::host::{HostContext, HostError, OpMode, OpModeHost};
use pico_command::traits::MockTime;
use pico_command::util::StateMachine;
use pico_command::{CommandError, CommandId, CommandRef, Compose, SchedulerError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

type Events = Rc<RefCell<Vec<String>>>;

/// Leaf that records its lifecycle and finishes after `ticks` executes
fn leaf(events: &Events, name: &'static str, ticks: u32) -> Lambda {
    let count = Rc::new(Cell::new(0u32));
    let (i, x, e) = (events.clone(), events.clone(), events.clone());
    let (ci, cx, cf) = (count.clone(), count.clone(), count);
    Lambda::new(name)
        .set_init(move || {
            ci.set(0);
            i.borrow_mut().push(format!("{name}:init"));
            Ok(())
        })
        .set_execute(move || {
            cx.set(cx.get() + 1);
            x.borrow_mut().push(format!("{name}:execute"));
            Ok(())
        })
        .set_finish(move || Ok(cf.get() >= ticks))
        .set_end(move |interrupted| {
            e.borrow_mut().push(format!("{name}:end:{interrupted}"));
            Ok(())
        })
}

fn shared(lambda: Lambda) -> CommandRef {
    Rc::new(lambda)
}

fn take(events: &Events) -> Vec<String> {
    std::mem::take(&mut *events.borrow_mut())
}

/// Lifecycle events only, executes dropped
fn lifecycle(events: &[String]) -> Vec<&str> {
    events
        .iter()
        .map(String::as_str)
        .filter(|event| !event.ends_with(":execute"))
        .collect()
}

struct Idle;

impl OpMode<MockTime> for Idle {}

fn active_host() -> (OpModeHost<MockTime>, Idle, MockTime) {
    let time = MockTime::new();
    let mut host = OpModeHost::new(time.clone());
    let mut mode = Idle;
    host.init(&mut mode).unwrap();
    host.start(&mut mode).unwrap();
    (host, mode, time)
}

/// Loop until `command` leaves the scheduler, returning the loop count
fn run_until_done(host: &mut OpModeHost<MockTime>, mode: &mut Idle, command: &CommandRef) -> usize {
    for tick in 1..=50 {
        host.run_loop(mode).unwrap();
        if !host.scheduler().is_scheduled(command) {
            return tick;
        }
    }
    panic!("command never finished");
}

#[test]
fn test_disjoint_commands_admitted_together() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let left = host.scheduler().register_resource("left drive");
    let right = host.scheduler().register_resource("right drive");
    let a = shared(leaf(&events, "a", u32::MAX).set_requirements([left]));
    let b = shared(leaf(&events, "b", u32::MAX).set_requirements([right]));

    host.scheduler().schedule(a.clone());
    host.scheduler().schedule(b.clone());
    host.run_loop(&mut mode).unwrap();

    assert_eq!(lifecycle(&take(&events)), ["a:init", "b:init"]);
    assert!(host.scheduler().is_active(&a));
    assert!(host.scheduler().is_active(&b));
}

#[test]
fn test_non_interruptible_holder_keeps_resource() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let lift = host.scheduler().register_resource("lift");
    let climb = shared(
        leaf(&events, "climb", u32::MAX)
            .set_requirements([lift])
            .set_interruptible(false),
    );
    let lower = shared(leaf(&events, "lower", u32::MAX).set_requirements([lift]));

    host.scheduler().schedule(climb.clone());
    host.scheduler().schedule(lower.clone());
    for _ in 0..3 {
        host.run_loop(&mut mode).unwrap();
    }

    assert_eq!(lifecycle(&take(&events)), ["climb:init"]);
    assert!(host.scheduler().is_active(&climb));
    assert!(!host.scheduler().is_scheduled(&lower));
    let owner = host.scheduler().owner_of(lift).unwrap();
    assert_eq!(CommandId::of(&owner), CommandId::of(&climb));
}

#[test]
fn test_sequential_runs_one_child_at_a_time() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let group: CommandRef = Rc::new(Sequential::new([
        shared(leaf(&events, "a", 2)),
        shared(leaf(&events, "b", 1)),
        shared(leaf(&events, "c", 1)),
    ]));

    host.scheduler().schedule(group.clone());
    run_until_done(&mut host, &mut mode, &group);

    assert_eq!(
        lifecycle(&take(&events)),
        [
            "a:init",
            "a:end:false",
            "b:init",
            "b:end:false",
            "c:init",
            "c:end:false"
        ]
    );
}

#[test]
fn test_parallel_starts_together_and_waits_for_all() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let a = shared(leaf(&events, "a", 1));
    let group: CommandRef = Rc::new(a.with([
        shared(leaf(&events, "b", 2)),
        shared(leaf(&events, "c", 4)),
    ]));

    host.scheduler().schedule(group.clone());
    host.run_loop(&mut mode).unwrap();
    assert_eq!(lifecycle(&take(&events)), ["a:init", "b:init", "c:init"]);

    run_until_done(&mut host, &mut mode, &group);
    let ended = take(&events);
    assert_eq!(
        lifecycle(&ended),
        ["a:end:false", "b:end:false", "c:end:false"]
    );
}

#[test]
fn test_race_interrupts_losers() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let group: CommandRef = Rc::new(Race::new(
        None,
        [
            shared(leaf(&events, "fast", 1)),
            shared(leaf(&events, "slow", u32::MAX)),
            shared(leaf(&events, "slower", u32::MAX)),
        ],
    ));

    host.scheduler().schedule(group.clone());
    run_until_done(&mut host, &mut mode, &group);

    assert_eq!(
        lifecycle(&take(&events)),
        [
            "fast:init",
            "slow:init",
            "slower:init",
            "fast:end:false",
            "slow:end:true",
            "slower:end:true"
        ]
    );
}

#[test]
fn test_race_deadline_governs_completion() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let deadline = shared(leaf(&events, "deadline", 3));
    let group: CommandRef = Rc::new(deadline.as_deadline([
        shared(leaf(&events, "short", 1)),
        shared(leaf(&events, "long", u32::MAX)),
    ]));

    host.scheduler().schedule(group.clone());
    let ticks = run_until_done(&mut host, &mut mode, &group);

    assert_eq!(ticks, 4);
    assert_eq!(
        lifecycle(&take(&events)),
        [
            "short:init",
            "long:init",
            "deadline:init",
            "short:end:false",
            "long:end:true",
            "deadline:end:false"
        ]
    );
}

#[test]
fn test_timeout_uses_wall_clock() {
    let (mut host, mut mode, time) = active_host();
    let events: Events = Rc::default();
    let spin = shared(leaf(&events, "spin", u32::MAX));
    let group: CommandRef = Rc::new(spin.timeout(Duration::from_millis(100), time.clone()));
    assert_eq!(group.to_string(), "(race (wait 0.1) (\n\tspin))");

    host.scheduler().schedule(group.clone());
    host.run_loop(&mut mode).unwrap();
    for _ in 0..3 {
        time.advance_by(Duration::from_millis(30));
        host.run_loop(&mut mode).unwrap();
    }
    assert!(host.scheduler().is_scheduled(&group));

    time.advance_by(Duration::from_millis(10));
    host.run_loop(&mut mode).unwrap();
    assert!(!host.scheduler().is_scheduled(&group));
    assert_eq!(lifecycle(&take(&events)), ["spin:init", "spin:end:true"]);
}

#[test]
fn test_schedule_is_idempotent() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let command = shared(leaf(&events, "once", u32::MAX));

    for _ in 0..3 {
        host.scheduler().schedule(command.clone());
        assert!(host.scheduler().is_scheduled(&command));
    }
    host.run_loop(&mut mode).unwrap();
    host.scheduler().schedule(command.clone());
    host.run_loop(&mut mode).unwrap();

    assert_eq!(lifecycle(&take(&events)), ["once:init"]);
    assert_eq!(host.scheduler().active_commands().len(), 1);
}

#[test]
fn test_failure_trace_marks_leaf() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let broken = shared(
        Lambda::new("broken").set_execute(|| Err(CommandError::failed("sensor unplugged"))),
    );
    let group: CommandRef = Rc::new(Sequential::new([
        shared(leaf(&events, "1", 1)),
        broken,
        shared(leaf(&events, "2", 1)),
    ]));

    host.scheduler().schedule(group.clone());
    let mut failure = None;
    for _ in 0..10 {
        if let Err(error) = host.run_loop(&mut mode) {
            failure = Some(error);
            break;
        }
    }

    let error = failure.unwrap();
    assert!(matches!(
        error,
        HostError::Scheduler(SchedulerError::Unwound(_))
    ));
    let message = error.to_string();
    assert!(message.starts_with("exception thrown in execute:"));
    assert!(message.contains("caused by: broken"));
    assert!(message.ends_with("(sequential (\n\t1\n\tERR\n\t2))"));
    assert!(!host.scheduler().is_scheduled(&group));

    // the session keeps running
    host.run_loop(&mut mode).unwrap();
}

#[test]
fn test_state_machine_enters_states_fresh() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let (first, second) = (events.clone(), events.clone());
    let machine = Rc::new(
        StateMachine::new(0u8)
            .with_state(0, move |cell, name| {
                let cell = cell.clone();
                shared(leaf(&first, "zero", 1).set_name(name).add_end(move |_| {
                    cell.set(1);
                    Ok(())
                }))
            })
            .with_state(1, move |_, name| shared(leaf(&second, "one", 1).set_name(name))),
    );
    let command: CommandRef = machine.clone();

    host.scheduler().schedule(command.clone());
    run_until_done(&mut host, &mut mode, &command);
    assert_eq!(
        lifecycle(&take(&events)),
        ["zero:init", "zero:end:false", "one:init", "one:end:false"]
    );

    machine.schedule_state(host.scheduler(), 1);
    host.run_loop(&mut mode).unwrap();
    assert_eq!(lifecycle(&take(&events)), ["one:init"]);
    assert_eq!(machine.to_string(), "(state-machine 1 (\n\t0\n\t1))");
}

#[test]
fn test_default_command_returns_after_task() {
    let (mut host, mut mode, _) = active_host();
    let events: Events = Rc::default();
    let intake = host.scheduler().register_resource("intake");
    let idle = shared(leaf(&events, "idle", u32::MAX).set_requirements([intake]));
    let task = shared(leaf(&events, "task", 1).set_requirements([intake]));
    host.scheduler().set_default_command(intake, Some(idle));

    host.run_loop(&mut mode).unwrap();
    host.scheduler().schedule(task.clone());
    run_until_done(&mut host, &mut mode, &task);
    host.run_loop(&mut mode).unwrap();

    assert_eq!(
        lifecycle(&take(&events)),
        [
            "idle:init",
            "idle:end:true",
            "task:init",
            "task:end:false",
            "idle:init"
        ]
    );
}

struct Teleop {
    button: Rc<Cell<bool>>,
    events: Events,
}

impl OpMode<MockTime> for Teleop {
    fn init(&mut self, ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
        let raw = self.button.clone();
        let command = shared(leaf(&self.events, "score", u32::MAX));
        ctx.inputs()
            .boolean(move || raw.get())
            .while_true(ctx.scheduler(), command);
        Ok(())
    }
}

#[test]
fn test_bound_input_drives_command_through_host() {
    let mut host = OpModeHost::new(MockTime::new());
    let events: Events = Rc::default();
    let button = Rc::new(Cell::new(false));
    let mut mode = Teleop {
        button: button.clone(),
        events: events.clone(),
    };

    host.init(&mut mode).unwrap();
    host.start(&mut mode).unwrap();
    host.run_loop(&mut mode).unwrap();
    assert!(take(&events).is_empty());

    button.set(true);
    host.run_loop(&mut mode).unwrap();
    host.run_loop(&mut mode).unwrap();
    assert_eq!(lifecycle(&take(&events)), ["score:init"]);

    button.set(false);
    host.run_loop(&mut mode).unwrap();
    host.run_loop(&mut mode).unwrap();
    assert_eq!(lifecycle(&take(&events)), ["score:end:false"]);

    // stopping drops the binding
    host.stop(&mut mode).unwrap();
    assert_eq!(host.scheduler().binding_count(), 0);
    assert!(host.inputs().is_empty());
}
