//! Round-robin tick behavior against the mock platform.

mod common;

use std::collections::HashMap;

use common::{booted_kernel, caller_context};
use trion_kernel::config::{kernel_stack_base, MAX_PROCESSES};
use trion_kernel::memory::frame_for;
use trion_kernel::{Pid, SavedContext, SpawnTarget, TickOutcome, Transition};

fn tick_context(n: u32) -> SavedContext {
    SavedContext::new(0x0060_0000 + n * 0x40, 0x0060_0020 + n * 0x40)
}

#[test]
fn test_idle_terminals_get_shells_lazily() {
    let mut kernel = booted_kernel();

    // First tick lands on terminal 1, which has no process yet.
    let outcome = kernel.on_tick(tick_context(0));
    let TickOutcome::Launch(Transition::EnterUser { pid: shell1, .. }) = outcome else {
        panic!("expected a shell launch, got {:?}", outcome);
    };
    assert_eq!(kernel.terminals().slot(1).active_pid, Some(shell1));
    assert_eq!(kernel.current_pid(), shell1);

    // Second tick brings up terminal 2 the same way.
    let outcome = kernel.on_tick(tick_context(1));
    let TickOutcome::Launch(Transition::EnterUser { pid: shell2, .. }) = outcome else {
        panic!("expected a shell launch, got {:?}", outcome);
    };
    assert_eq!(kernel.terminals().slot(2).active_pid, Some(shell2));
    assert_ne!(shell1, shell2);
}

#[test]
fn test_tick_switches_context_and_address_space() {
    let mut kernel = booted_kernel();
    kernel.on_tick(tick_context(0)); // shell for terminal 1
    let shell1 = kernel.current_pid();
    kernel.on_tick(tick_context(1)); // shell for terminal 2
    kernel.on_tick(tick_context(2)); // back to terminal 0

    assert_eq!(kernel.current_pid(), Pid::ROOT);
    assert_eq!(kernel.platform().mapped_frame, frame_for(Pid::ROOT));
    assert_eq!(
        kernel.platform().kernel_stacks.last(),
        Some(&kernel_stack_base(Pid::ROOT))
    );

    // Terminal 1's turn: resume whatever context its shell suspended
    // with, which for a fresh launch is the bootstrap-spawn save.
    let outcome = kernel.on_tick(tick_context(3));
    assert!(matches!(outcome, TickOutcome::Switch(_)));
    assert_eq!(kernel.current_pid(), shell1);
}

#[test]
fn test_suspended_context_round_trips() {
    let mut kernel = booted_kernel();
    kernel.on_tick(tick_context(0));
    kernel.on_tick(tick_context(1));
    kernel.on_tick(tick_context(2)); // current: root, terminal 0

    // Suspend root with a distinctive context; two full laps later its
    // slot comes up again and that exact context must come back.
    let parked = tick_context(42);
    kernel.on_tick(parked); // -> terminal 1
    kernel.on_tick(tick_context(5)); // -> terminal 2
    let outcome = kernel.on_tick(tick_context(6)); // -> terminal 0
    assert_eq!(outcome, TickOutcome::Switch(parked));
}

#[test]
fn test_round_robin_is_fair() {
    let mut kernel = booted_kernel();
    let mut turns: HashMap<Pid, u32> = HashMap::new();

    for n in 0..99 {
        kernel.on_tick(tick_context(n));
        *turns.entry(kernel.current_pid()).or_default() += 1;
    }

    assert_eq!(turns.len(), 3);
    for (&pid, &count) in &turns {
        assert_eq!(count, 33, "pid {} got an uneven share", pid);
    }
}

#[test]
fn test_timer_acked_every_tick() {
    let mut kernel = booted_kernel();
    for n in 0..10 {
        kernel.on_tick(tick_context(n));
    }
    assert_eq!(kernel.platform().timer_acks, 10);
}

#[test]
fn test_failed_shell_spawn_stays_put() {
    let mut kernel = booted_kernel();
    // Exhaust the process table before terminal 1 ever gets a turn.
    for i in 1..MAX_PROCESSES {
        kernel
            .spawn("shell", SpawnTarget::InheritCurrent, caller_context(i as u32))
            .unwrap();
    }
    let before = kernel.current_pid();

    let outcome = kernel.on_tick(tick_context(0));
    assert_eq!(outcome, TickOutcome::Stay);
    assert_eq!(kernel.current_pid(), before);
    assert_eq!(kernel.terminals().slot(1).active_pid, None);
}
