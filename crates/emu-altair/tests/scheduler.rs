//! Timer firing order against the instruction stream.

use std::cell::RefCell;
use std::rc::Rc;

use emu_altair::{Altair, AltairBus, AltairConfig, CpuVariant, Scheduler, TimerError, MAX_TIMERS};

const ONE_SHOT: usize = 0;
const PERIODIC: usize = 1;

type Log = Rc<RefCell<Vec<(usize, u64)>>>;

/// NOPs everywhere: 4 cycles per step, so every deadline below lands
/// exactly on an instruction boundary.
fn machine_with_timers(stop_periodic_after: Option<usize>) -> (Altair, Log) {
    let mut sys = Altair::new(&AltairConfig::default());
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&log);
    sys.scheduler_mut()
        .setup(ONE_SHOT, 500, move |sched: &mut Scheduler<AltairBus>, _| {
            sink.borrow_mut().push((ONE_SHOT, sched.now().get()));
        })
        .unwrap();

    let sink = Rc::clone(&log);
    let mut fired = 0;
    sys.scheduler_mut()
        .setup(PERIODIC, 250, move |sched: &mut Scheduler<AltairBus>, _| {
            fired += 1;
            sink.borrow_mut().push((PERIODIC, sched.now().get()));
            if Some(fired) == stop_periodic_after {
                sched.stop(PERIODIC);
            }
        })
        .unwrap();

    // 500 µs and 250 µs at 2 MHz: 1000 and 500 cycles.
    sys.scheduler_mut().start(ONE_SHOT, 0, false);
    sys.scheduler_mut().start(PERIODIC, 0, true);
    (sys, log)
}

#[test]
fn one_shot_and_periodic_fire_in_cycle_order() {
    let (mut sys, log) = machine_with_timers(None);
    assert_eq!(sys.run_cycles(2000), 2000);
    assert_eq!(
        *log.borrow(),
        [
            (PERIODIC, 500),
            (ONE_SHOT, 1000),
            (PERIODIC, 1000),
            (PERIODIC, 1500),
            (PERIODIC, 2000),
        ]
    );
    assert!(!sys.scheduler().running(ONE_SHOT));
    assert!(sys.scheduler().running(PERIODIC));
    assert_eq!(sys.scheduler().remaining(PERIODIC), Some(500));
}

#[test]
fn stopping_the_periodic_timer_cancels_later_firings() {
    let (mut sys, log) = machine_with_timers(Some(2));
    sys.run_cycles(2000);
    assert_eq!(
        *log.borrow(),
        [(PERIODIC, 500), (ONE_SHOT, 1000), (PERIODIC, 1000)]
    );
    assert!(!sys.scheduler().running(PERIODIC));
    assert_eq!(sys.scheduler().next_deadline(), None);
}

#[test]
fn no_timer_fires_before_its_cycle() {
    let (mut sys, log) = machine_with_timers(None);
    sys.run_cycles(496);
    assert!(log.borrow().is_empty());
    sys.step();
    assert_eq!(*log.borrow(), [(PERIODIC, 500)]);
}

#[test]
fn restart_moves_the_deadline() {
    let (mut sys, log) = machine_with_timers(None);
    sys.scheduler_mut().stop(PERIODIC);
    sys.run_cycles(400);
    // Restarted at cycle 400 with a 100 µs override: due at 600.
    sys.scheduler_mut().start(ONE_SHOT, 100, false);
    assert_eq!(sys.scheduler().period(ONE_SHOT), Some(100));
    sys.run_cycles(400);
    assert_eq!(*log.borrow(), [(ONE_SHOT, 600)]);
}

#[test]
fn setup_errors_are_reported() {
    let (mut sys, _log) = machine_with_timers(None);
    assert_eq!(
        sys.scheduler_mut().setup(PERIODIC, 10, |_, _| {}),
        Err(TimerError::AlreadyBound { id: PERIODIC })
    );
    assert_eq!(
        sys.scheduler_mut().setup(MAX_TIMERS, 10, |_, _| {}),
        Err(TimerError::OutOfRange { id: MAX_TIMERS })
    );
}

#[test]
fn rebasing_is_invisible() {
    let config = AltairConfig {
        rebase_threshold: 256,
        ..AltairConfig::default()
    };
    let mut sys = Altair::new(&config);
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    sys.scheduler_mut()
        .setup(3, 1000, move |sched: &mut Scheduler<AltairBus>, _| {
            sink.borrow_mut().push((3, sched.now().get()));
        })
        .unwrap();
    sys.scheduler_mut().start(3, 0, true);

    sys.run_cycles(10_000);
    assert_eq!(sys.now().get(), 10_000);
    assert!(sys.scheduler().clock().counter() < 256 + 4);
    let times: Vec<u64> = log.borrow().iter().map(|&(_, t)| t).collect();
    assert_eq!(times, [2000, 4000, 6000, 8000, 10_000]);
}

#[test]
fn z80_board_keeps_the_half_microsecond_timer_base() {
    let config = AltairConfig {
        cpu: CpuVariant::Z80,
        ..AltairConfig::default()
    };
    let mut sys = Altair::new(&config);
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    sys.scheduler_mut()
        .setup(ONE_SHOT, 500, move |sched: &mut Scheduler<AltairBus>, _| {
            sink.borrow_mut().push((ONE_SHOT, sched.now().get()));
        })
        .unwrap();
    sys.scheduler_mut().start(ONE_SHOT, 0, false);
    assert_eq!(sys.scheduler().remaining(ONE_SHOT), Some(1000));

    // Z80 NOPs are 4 T-states too.
    sys.run_cycles(1000);
    assert_eq!(*log.borrow(), [(ONE_SHOT, 1000)]);
}

#[test]
fn oversized_periods_clamp_to_the_counter_range() {
    let (mut sys, _log) = machine_with_timers(None);
    sys.run_cycles(8);
    // 2^32 - 1 µs is twice the counter range; the deadline clamps.
    sys.scheduler_mut().start(ONE_SHOT, u32::MAX, false);
    assert_eq!(sys.scheduler().remaining(ONE_SHOT), Some(u32::MAX));
    assert_eq!(sys.scheduler().next_deadline().map(|t| t.get()), Some(500));
    assert_eq!(sys.scheduler().period(ONE_SHOT), Some(u32::MAX));
}
