use std::collections::BinaryHeap;
use std::cmp::Ordering;

pub type Tick = u64;
pub type ProcessId = usize;

/// What a process wants after being resumed.
///
/// There is no blocking: a process that cannot make progress asks to be
/// polled again after a number of ticks (at least one).
pub enum ProcessState {
    Finished,
    Wait(Tick),
}

pub trait Process<T> {
    fn resume(&mut self, sim: &mut Simulation<T>) -> ProcessState;
}

#[derive(Eq, PartialEq, Debug)]
pub struct QueuedWakeup {
    pub tick: Tick,
    pub id: usize,
    pub process: ProcessId,
}

impl Ord for QueuedWakeup {
    fn cmp(&self, other :&QueuedWakeup) -> Ordering {
        // Note that the order is flipped on purpose -- to turn
        // the (maximum) BinaryHeap into a minimum heap.
        other.tick.cmp(&self.tick).
            then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueuedWakeup {
    fn partial_cmp(&self,other :&QueuedWakeup) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[test]
fn test_ordering() {
    let mut p = BinaryHeap::new();
    p.push(QueuedWakeup { tick: 123, id: 0, process: 0 });
    p.push(QueuedWakeup { tick: 7, id: 2, process: 1 });
    p.push(QueuedWakeup { tick: 7, id: 1, process: 2 });
    p.push(QueuedWakeup { tick: 122, id: 3, process: 3 });
    assert_eq!(p.pop().unwrap().process, 2);
    assert_eq!(p.pop().unwrap().process, 1);
    assert_eq!(p.pop().unwrap().tick, 122);
    assert_eq!(p.pop().unwrap().tick, 123);
}

#[derive(Default)]
pub struct Scheduler {
    pub time: Tick,
    pub queue: BinaryHeap<QueuedWakeup>,
    id_counter: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Default::default()
    }

    /// Wake `process` after `dt` ticks. Wakeups at the same tick are
    /// delivered in the order they were scheduled.
    pub fn schedule(&mut self, process: ProcessId, dt: Tick) {
        let qe = QueuedWakeup {
            tick: self.time + dt,
            id: self.id_counter,
            process: process,
        };
        self.id_counter += 1;
        self.queue.push(qe);
    }
}

pub struct Simulation<T> {
    pub world: T,
    procs: Vec<Option<Box<dyn Process<T>>>>,
    pub scheduler: Scheduler,
}

impl<T> Simulation<T> {
    pub fn new(world: T) -> Self {
        Simulation {
            procs: Vec::new(),
            scheduler: Scheduler::new(),
            world: world,
        }
    }

    pub fn time(&self) -> Tick { self.scheduler.time }

    /// Registers a process and resumes it immediately.
    pub fn start_process(&mut self, p: Box<dyn Process<T>>) -> ProcessId {
        let process_id = self.procs.len();
        self.procs.push(Some(p));
        self.resume(process_id);
        process_id
    }

    pub fn advance_by(&mut self, dt: Tick) {
        let target = self.time() + dt;
        self.advance_to(target);
    }

    pub fn advance_to(&mut self, target: Tick) {
        while let Some(&QueuedWakeup { tick, .. }) = self.scheduler.queue.peek() {
            if tick > target {
                break;
            }
            self.step();
        }

        if target > self.time() {
            self.scheduler.time = target;
        }
    }

    pub fn step(&mut self) -> bool {
        match self.scheduler.queue.pop() {
            Some(wakeup) => {
                if wakeup.tick > self.time() {
                    self.scheduler.time = wakeup.tick;
                }
                self.resume(wakeup.process);
                true
            }
            None => false,
        }
    }

    fn resume(&mut self, process_id: ProcessId) {
        // The process is taken out of the simulation while it runs, so
        // that it can borrow the simulation mutably.
        if let Some(mut process) = self.procs[process_id].take() {
            match process.resume(self) {
                ProcessState::Finished => {}
                ProcessState::Wait(dt) => {
                    self.procs[process_id] = Some(process);
                    self.scheduler.schedule(process_id, dt.max(1));
                }
            }
        }
    }
}
