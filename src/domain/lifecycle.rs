//! Task lifecycle orchestration
//!
//! [`TaskMaster`] owns every holding area and moves tasks between them:
//!
//! | Holding | Structure | Leaves via |
//! |---------|-----------|------------|
//! | Active | [`ActiveStack`] | move, sleep, wake-at, block, close |
//! | Backlog | [`PriorityQueue`] keyed by priority | backfill, activate |
//! | Sleeping | [`Dorm`] keyed by wake time | sweep, activate |
//! | Blocked | [`Limbo`] | unblock / close of the last blocker |
//! | Closed | graveyard list | never |
//!
//! Task data lives once, in an arena tagged with its single [`Holding`]; the
//! structures only hold ids. Every move retags the arena entry, so a task
//! can never be owned by two areas at the same time.
//!
//! Only [`TaskMaster::add`] and the current-task accessors sweep the dorm.
//! Every other command acts on whatever is on top of the stack right now, so
//! a task that happens to wake up cannot slip in under the caller.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::clock::Clock;
use super::dorm::Dorm;
use super::error::ScheduleError;
use super::id::TaskId;
use super::limbo::Limbo;
use super::priority::Priority;
use super::priority_queue::PriorityQueue;
use super::stack::ActiveStack;
use super::task::Task;

/// Which holding area currently owns a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Holding {
    Active,
    Backlog,
    Sleeping,
    Blocked,
    Closed,
}

impl Holding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Holding::Active => "active",
            Holding::Backlog => "backlog",
            Holding::Sleeping => "sleeping",
            Holding::Blocked => "blocked",
            Holding::Closed => "closed",
        }
    }
}

impl fmt::Display for Holding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    task: Task,
    holding: Holding,
}

pub struct TaskMaster {
    clock: Arc<dyn Clock>,
    tasks: HashMap<TaskId, Tracked>,
    stack: ActiveStack<TaskId>,
    backlog: PriorityQueue<TaskId, Priority>,
    dorm: Dorm<TaskId>,
    limbo: Limbo<TaskId>,
    graveyard: Vec<TaskId>,
    dirty: BTreeSet<TaskId>,
}

impl TaskMaster {
    /// Creates an empty lifecycle
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            dorm: Dorm::new(Arc::clone(&clock)),
            clock,
            tasks: HashMap::new(),
            stack: ActiveStack::new(),
            backlog: PriorityQueue::new(),
            limbo: Limbo::new(),
            graveyard: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Rebuilds a lifecycle from persisted structures
    ///
    /// `active` is bottom-first, `backlog` in the order it should be served.
    /// Nothing restored is considered modified.
    pub fn restore(
        clock: Arc<dyn Clock>,
        active: Vec<Task>,
        backlog: Vec<Task>,
        graveyard: Vec<Task>,
    ) -> Result<Self, ScheduleError> {
        let mut master = Self::new(clock);

        for task in active {
            let id = task.id.clone();
            master.track(task, Holding::Active)?;
            master.stack.push(id);
        }
        for task in backlog {
            let (id, priority) = (task.id.clone(), task.priority);
            master.track(task, Holding::Backlog)?;
            master.backlog.put(id, priority);
        }
        for task in graveyard {
            let id = task.id.clone();
            master.track(task, Holding::Closed)?;
            master.graveyard.push(id);
        }

        debug!(
            active = master.stack.len(),
            backlog = master.backlog.size(),
            closed = master.graveyard.len(),
            "restored task structures"
        );
        Ok(master)
    }

    fn track(&mut self, task: Task, holding: Holding) -> Result<(), ScheduleError> {
        if let Some(existing) = self.tasks.get(&task.id) {
            return Err(ScheduleError::AlreadyTracked {
                id: task.id,
                holding: existing.holding,
            });
        }
        self.tasks.insert(task.id.clone(), Tracked { task, holding });
        Ok(())
    }

    fn retag(&mut self, id: &TaskId, holding: Holding) {
        if let Some(tracked) = self.tasks.get_mut(id) {
            tracked.holding = holding;
        }
    }

    fn tracked(&self, id: &TaskId) -> Result<&Tracked, ScheduleError> {
        self.tasks
            .get(id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))
    }

    /// Pushes every task whose wake time has passed onto the active stack
    fn sweep(&mut self) -> usize {
        let tasks = &mut self.tasks;
        let stack = &mut self.stack;
        let woken = self.dorm.reveille(|id| {
            debug!(task = %id, "woke up");
            if let Some(tracked) = tasks.get_mut(&id) {
                tracked.holding = Holding::Active;
            }
            stack.push(id);
        });
        if woken > 0 {
            info!("{} sleeping task(s) woke up", woken);
        }
        woken
    }

    /// Pushes released tasks back onto the active stack
    fn resolve(&mut self, resolved: &TaskId) -> Vec<TaskId> {
        let tasks = &mut self.tasks;
        let stack = &mut self.stack;
        let mut released = Vec::new();
        self.limbo.unblock(resolved, |id| {
            debug!(task = %id, blocker = %resolved, "unblocked");
            if let Some(tracked) = tasks.get_mut(&id) {
                tracked.holding = Holding::Active;
            }
            stack.push(id.clone());
            released.push(id);
        });
        released
    }

    /// Sweeps the dorm and makes sure something is on top of the stack
    fn surface(&mut self) -> Result<TaskId, ScheduleError> {
        self.sweep();
        if self.stack.is_empty() {
            // feed the stack the top priority item from the backlog
            let (id, priority) = self.backlog.get()?;
            debug!(task = %id, %priority, "pulled from backlog");
            self.retag(&id, Holding::Active);
            self.stack.push(id);
        }
        Ok(self.stack.peek()?.clone())
    }

    /// Places a new task on top of the active stack
    pub fn add(&mut self, task: Task) -> Result<(), ScheduleError> {
        if let Some(existing) = self.tasks.get(&task.id) {
            return Err(ScheduleError::AlreadyTracked {
                id: task.id,
                holding: existing.holding,
            });
        }
        self.sweep();

        let id = task.id.clone();
        info!(task = %id, "added task");
        self.track(task, Holding::Active)?;
        self.dirty.insert(id.clone());
        self.stack.push(id);
        Ok(())
    }

    /// The task on top of the active stack, backfilled from the backlog
    ///
    /// Fails with [`ScheduleError::Empty`] when there is nothing to do.
    pub fn current_task(&mut self) -> Result<&Task, ScheduleError> {
        let id = self.surface()?;
        Ok(&self.tracked(&id)?.task)
    }

    /// Like [`TaskMaster::current_task`], but pops the task off the stack
    ///
    /// The task leaves every holding area; the caller owns it from now on.
    /// Tasks it was blocking are resolved as if it had been closed.
    pub fn take_active(&mut self) -> Result<Task, ScheduleError> {
        self.surface()?;
        let id = self.stack.pop()?;
        self.dirty.remove(&id);
        let task = self
            .tasks
            .remove(&id)
            .map(|tracked| tracked.task)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;

        let released = self.resolve(&id);
        if !released.is_empty() {
            info!("taking '{}' unblocked {} task(s)", id, released.len());
        }
        Ok(task)
    }

    /// Moves the top of the active stack into the backlog
    pub fn move_to_backlog(&mut self) -> Result<TaskId, ScheduleError> {
        let id = self.stack.pop()?;
        let priority = self.tracked(&id)?.task.priority;
        self.backlog.put(id.clone(), priority);
        self.retag(&id, Holding::Backlog);
        info!(task = %id, %priority, "moved task to backlog");
        Ok(id)
    }

    /// Puts the top of the active stack to sleep for `duration`
    pub fn sleep(&mut self, duration: Duration) -> Result<(TaskId, DateTime<Utc>), ScheduleError> {
        let id = self.stack.pop()?;
        let wake_at = self.dorm.sleep(id.clone(), duration);
        self.retag(&id, Holding::Sleeping);
        info!(task = %id, %wake_at, "task sleeping");
        Ok((id, wake_at))
    }

    /// Puts the top of the active stack to sleep until `timestamp`
    pub fn wake_at(&mut self, timestamp: DateTime<Utc>) -> Result<TaskId, ScheduleError> {
        let id = self.stack.pop()?;
        self.dorm.wake_at(id.clone(), timestamp);
        self.retag(&id, Holding::Sleeping);
        info!(task = %id, wake_at = %timestamp, "task sleeping");
        Ok(id)
    }

    /// Closes the top of the active stack and archives it
    ///
    /// Anything blocked only by the closed task is released onto the stack.
    pub fn close(&mut self) -> Result<TaskId, ScheduleError> {
        let id = self.stack.pop()?;
        let now = self.clock.now();
        if let Some(tracked) = self.tasks.get_mut(&id) {
            tracked.task.close(now);
            tracked.holding = Holding::Closed;
        }
        self.graveyard.push(id.clone());
        self.dirty.insert(id.clone());
        info!(task = %id, "closed task");

        let released = self.resolve(&id);
        if !released.is_empty() {
            info!("closing '{}' unblocked {} task(s)", id, released.len());
        }
        Ok(id)
    }

    /// Moves the top of the active stack into limbo until `blocked_by` is resolved
    pub fn block(&mut self, blocked_by: &str) -> Result<TaskId, ScheduleError> {
        let id = self.stack.peek()?.clone();
        let blocker = self.blocker_for(&id, blocked_by)?;

        self.limbo.block(id.clone(), blocker.clone())?;
        self.stack.pop()?;
        self.retag(&id, Holding::Blocked);
        info!(task = %id, %blocker, "task blocked");
        Ok(id)
    }

    /// Adds another blocker to a task that is already blocked
    pub fn add_blocker(&mut self, item: &str, blocked_by: &str) -> Result<TaskId, ScheduleError> {
        let (id, holding) = self.locate(item)?;
        if holding != Holding::Blocked {
            return Err(ScheduleError::Unavailable { id, holding });
        }
        let blocker = self.blocker_for(&id, blocked_by)?;

        self.limbo.block(id.clone(), blocker.clone())?;
        info!(task = %id, %blocker, "task blocked");
        Ok(id)
    }

    /// Resolves a blocker, pushing fully released tasks onto the active stack
    pub fn unblock(&mut self, resolved: &TaskId) -> Vec<TaskId> {
        self.resolve(resolved)
    }

    /// Resolves `prefix` to a task that may block `item`
    ///
    /// Closed tasks never resolve, and a blocker whose own chain of blockers
    /// leads back to `item` would leave both stuck in limbo.
    fn blocker_for(&self, item: &TaskId, prefix: &str) -> Result<TaskId, ScheduleError> {
        let (blocker, holding) = self.locate(prefix)?;
        if holding == Holding::Closed {
            return Err(ScheduleError::Unavailable {
                id: blocker,
                holding,
            });
        }
        if blocker == *item {
            return Err(ScheduleError::SelfBlock(blocker));
        }
        if self.waits_on(&blocker, item) {
            return Err(ScheduleError::BlockCycle {
                item: item.clone(),
                blocker,
            });
        }
        Ok(blocker)
    }

    /// True if `task` is transitively blocked by `target`
    fn waits_on(&self, task: &TaskId, target: &TaskId) -> bool {
        let mut seen = BTreeSet::new();
        let mut pending = vec![task.clone()];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            for blocker in self.limbo.blockers_of(&next) {
                if blocker == *target {
                    return true;
                }
                pending.push(blocker);
            }
        }
        false
    }

    /// Brings a tracked task to the top of the active stack
    ///
    /// Backlog and sleeping tasks are pulled out of their area first; an
    /// active task is simply moved to the top.
    pub fn activate(&mut self, prefix: &str) -> Result<TaskId, ScheduleError> {
        let (id, holding) = self.locate(prefix)?;
        let removed = match holding {
            Holding::Active => self.stack.remove_where(|other| *other == id).is_some(),
            Holding::Backlog => self.backlog.remove_first(|other| *other == id).is_some(),
            Holding::Sleeping => self.dorm.wake(|other| *other == id).is_some(),
            Holding::Blocked | Holding::Closed => {
                return Err(ScheduleError::Unavailable { id, holding });
            }
        };
        if !removed {
            return Err(ScheduleError::NotFound(prefix.to_string()));
        }

        self.stack.push(id.clone());
        self.retag(&id, Holding::Active);
        info!(task = %id, from = %holding, "activated task");
        Ok(id)
    }

    /// Prefix-match search across all holding areas
    ///
    /// Searched in a fixed order: active, backlog, blocked, sleeping, closed.
    pub fn find(&self, prefix: &str) -> Result<(&Task, Holding), ScheduleError> {
        let (id, holding) = self.locate(prefix)?;
        Ok((&self.tracked(&id)?.task, holding))
    }

    fn locate(&self, prefix: &str) -> Result<(TaskId, Holding), ScheduleError> {
        if let Ok(id) = self.stack.find(prefix) {
            return Ok((id.clone(), Holding::Active));
        }
        if let Ok(id) = self.backlog.find(prefix) {
            return Ok((id, Holding::Backlog));
        }
        if let Ok(id) = self.limbo.find(prefix) {
            return Ok((id.clone(), Holding::Blocked));
        }
        if let Ok(id) = self.dorm.find(prefix) {
            return Ok((id, Holding::Sleeping));
        }
        self.graveyard
            .iter()
            .find(|id| id.matches_prefix(prefix))
            .map(|id| (id.clone(), Holding::Closed))
            .ok_or_else(|| ScheduleError::NotFound(prefix.to_string()))
    }

    /// Replaces a tracked task's data
    ///
    /// A backlog task whose priority changed is re-queued at the back of its
    /// new priority level. Closed tasks are immutable.
    pub fn update(&mut self, task: Task) -> Result<(), ScheduleError> {
        let tracked = self.tracked(&task.id)?;
        let holding = tracked.holding;
        if holding == Holding::Closed {
            return Err(ScheduleError::Unavailable {
                id: task.id,
                holding,
            });
        }

        let old_priority = tracked.task.priority;
        if holding == Holding::Backlog && old_priority != task.priority {
            let id = task.id.clone();
            if self.backlog.remove_first(|other| *other == id).is_some() {
                self.backlog.put(id, task.priority);
            }
            debug!(task = %task.id, from = %old_priority, to = %task.priority, "re-queued task");
        }

        let id = task.id.clone();
        if let Some(tracked) = self.tasks.get_mut(&id) {
            tracked.task = task;
        }
        self.dirty.insert(id);
        Ok(())
    }

    /// Changes the priority of the task matching `prefix`
    pub fn set_priority(&mut self, prefix: &str, priority: Priority) -> Result<TaskId, ScheduleError> {
        let (task, _) = self.find(prefix)?;
        let mut task = task.clone();
        let id = task.id.clone();
        task.set_priority(priority);
        self.update(task)?;
        Ok(id)
    }

    /// Looks up a tracked task by full id
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id).map(|tracked| &tracked.task)
    }

    /// Which area owns `id`, if any
    pub fn holding(&self, id: &TaskId) -> Option<Holding> {
        self.tasks.get(id).map(|tracked| tracked.holding)
    }

    /// Active tasks, most recent first
    pub fn active(&self) -> Vec<&Task> {
        self.stack.dump().filter_map(|id| self.get(id)).collect()
    }

    /// Backlog tasks in the order they would be served
    pub fn backlog(&self) -> Vec<&Task> {
        self.backlog
            .snapshot()
            .iter()
            .filter_map(|(id, _)| self.get(id))
            .collect()
    }

    /// Sleeping tasks with their wake times, earliest first
    pub fn sleeping(&self) -> Vec<(&Task, DateTime<Utc>)> {
        self.dorm
            .entries()
            .iter()
            .filter_map(|(id, wake_at)| self.get(id).map(|task| (task, *wake_at)))
            .collect()
    }

    /// Blocked tasks with their unresolved blocker count, oldest first
    pub fn blocked(&self) -> Vec<(&Task, usize)> {
        let mut blocked: Vec<_> = self
            .limbo
            .items()
            .filter_map(|id| self.get(id).map(|task| (task, self.limbo.refcount(id))))
            .collect();
        blocked.sort_by(|(a, _), (b, _)| {
            a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
        });
        blocked
    }

    /// Closed tasks, in the order they were closed
    pub fn graveyard(&self) -> Vec<&Task> {
        self.graveyard.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Active ids bottom-first, as [`TaskMaster::restore`] expects them
    pub fn active_ids(&self) -> Vec<TaskId> {
        self.stack.bottom_up().cloned().collect()
    }

    /// Backlog ids in serving order
    pub fn backlog_ids(&self) -> Vec<TaskId> {
        self.backlog.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    pub fn graveyard_ids(&self) -> Vec<TaskId> {
        self.graveyard.clone()
    }

    /// Returns the tasks modified since the last call
    pub fn take_dirty(&mut self) -> Vec<Task> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty
            .into_iter()
            .filter_map(|id| self.get(&id).cloned())
            .collect()
    }

    /// Total number of tracked tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn master() -> (Arc<ManualClock>, TaskMaster) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let master = TaskMaster::new(clock.clone() as Arc<dyn Clock>);
        (clock, master)
    }

    fn task(description: &str, priority: u32) -> Task {
        Task::new(description, "quick").with_priority(Priority::new(priority))
    }

    /// Adds a task and shelves it straight into the backlog
    fn backlog_task(master: &mut TaskMaster, description: &str, priority: u32) -> TaskId {
        let task = task(description, priority);
        let id = task.id.clone();
        master.add(task).unwrap();
        master.move_to_backlog().unwrap();
        id
    }

    #[test]
    fn add_then_current_peeks_without_removing() {
        let (_clock, mut master) = master();
        let t = task("Write report", 3);
        let id = t.id.clone();
        master.add(t).unwrap();

        assert_eq!(master.current_task().unwrap().id, id);
        assert_eq!(master.current_task().unwrap().id, id);
        assert_eq!(master.holding(&id), Some(Holding::Active));
    }

    #[test]
    fn close_archives_and_leaves_nothing_to_do() {
        let (_clock, mut master) = master();
        let t = task("Write report", 3);
        let id = t.id.clone();
        master.add(t).unwrap();

        assert_eq!(master.close().unwrap(), id);
        assert_eq!(master.current_task().unwrap_err(), ScheduleError::Empty);
        assert_eq!(master.holding(&id), Some(Holding::Closed));
        assert!(master.get(&id).unwrap().is_closed());
    }

    #[test]
    fn current_on_cold_start_is_empty() {
        let (_clock, mut master) = master();
        assert_eq!(master.current_task().unwrap_err(), ScheduleError::Empty);
        assert_eq!(master.take_active().unwrap_err(), ScheduleError::Empty);
    }

    #[test]
    fn move_on_empty_stack_leaves_backlog_untouched() {
        let (_clock, mut master) = master();
        let queued = backlog_task(&mut master, "Queued", 2);

        assert_eq!(master.move_to_backlog().unwrap_err(), ScheduleError::Empty);
        assert_eq!(master.backlog_ids(), vec![queued]);
    }

    #[test]
    fn backfill_pulls_most_urgent_backlog_task() {
        let (_clock, mut master) = master();
        backlog_task(&mut master, "Low", 4);
        let urgent = backlog_task(&mut master, "Urgent", 1);
        backlog_task(&mut master, "Medium", 3);

        assert_eq!(master.current_task().unwrap().id, urgent);
        assert_eq!(master.holding(&urgent), Some(Holding::Active));
        assert_eq!(master.backlog().len(), 2);
    }

    #[test]
    fn backlog_serves_priority_then_fifo() {
        let (_clock, mut master) = master();
        let a = backlog_task(&mut master, "a", 3);
        let b = backlog_task(&mut master, "b", 1);
        let c = backlog_task(&mut master, "c", 2);
        let d = backlog_task(&mut master, "d", 1);

        assert_eq!(master.backlog_ids(), vec![b.clone(), d.clone(), c.clone(), a.clone()]);

        let mut served = Vec::new();
        while let Ok(task) = master.take_active() {
            served.push(task.id);
        }
        assert_eq!(served, vec![b, d, c, a]);
        assert!(master.is_empty());
    }

    #[test]
    fn sleeping_task_wakes_onto_the_stack() {
        let (clock, mut master) = master();
        let t = task("Nap", 3);
        let id = t.id.clone();
        master.add(t).unwrap();

        let (slept, wake_at) = master.sleep(Duration::minutes(1)).unwrap();
        assert_eq!(slept, id);
        assert_eq!(wake_at, clock.now() + Duration::minutes(1));
        assert_eq!(master.holding(&id), Some(Holding::Sleeping));
        assert_eq!(master.current_task().unwrap_err(), ScheduleError::Empty);

        clock.advance(Duration::minutes(2));
        assert_eq!(master.current_task().unwrap().id, id);
        assert_eq!(master.holding(&id), Some(Holding::Active));
    }

    #[test]
    fn woken_task_takes_precedence_over_backlog() {
        let (clock, mut master) = master();
        backlog_task(&mut master, "Backlog", 0);
        let sleeper = task("Sleeper", 4);
        let sleeper_id = sleeper.id.clone();
        master.add(sleeper).unwrap();
        master.wake_at(clock.now() + Duration::seconds(10)).unwrap();

        clock.advance(Duration::seconds(10));
        assert_eq!(master.current_task().unwrap().id, sleeper_id);
    }

    #[test]
    fn commands_other_than_add_and_current_do_not_sweep() {
        let (clock, mut master) = master();
        let sleeper = task("Sleeper", 3);
        let sleeper_id = sleeper.id.clone();
        master.add(sleeper).unwrap();
        master.sleep(Duration::minutes(1)).unwrap();

        let worker = task("Worker", 3);
        let worker_id = worker.id.clone();
        master.add(worker).unwrap();

        clock.advance(Duration::minutes(5));
        // the sleeper is due, but close must act on the worker
        assert_eq!(master.close().unwrap(), worker_id);
        assert_eq!(master.holding(&sleeper_id), Some(Holding::Sleeping));
        assert_eq!(master.move_to_backlog().unwrap_err(), ScheduleError::Empty);

        assert_eq!(master.current_task().unwrap().id, sleeper_id);
    }

    #[test]
    fn add_sweeps_before_pushing() {
        let (clock, mut master) = master();
        let sleeper = task("Sleeper", 3);
        let sleeper_id = sleeper.id.clone();
        master.add(sleeper).unwrap();
        master.sleep(Duration::minutes(1)).unwrap();

        clock.advance(Duration::minutes(1));
        let fresh = task("Fresh", 3);
        let fresh_id = fresh.id.clone();
        master.add(fresh).unwrap();

        let active: Vec<_> = master.active().iter().map(|t| t.id.clone()).collect();
        assert_eq!(active, vec![fresh_id, sleeper_id]);
    }

    #[test]
    fn simultaneous_wakeups_land_in_reverse_urgency() {
        let (clock, mut master) = master();
        let now = clock.now();
        let urgent = task("Urgent", 3);
        let later = task("Later", 3);
        let (urgent_id, later_id) = (urgent.id.clone(), later.id.clone());

        master.add(urgent).unwrap();
        master.wake_at(now + Duration::seconds(1)).unwrap();
        master.add(later).unwrap();
        master.wake_at(now + Duration::seconds(2)).unwrap();

        clock.advance(Duration::minutes(1));
        // earliest wake is released first and ends up below the later one
        assert_eq!(master.current_task().unwrap().id, later_id);
        let active: Vec<_> = master.active().iter().map(|t| t.id.clone()).collect();
        assert_eq!(active, vec![later_id, urgent_id]);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let (_clock, mut master) = master();
        let t = task("Once", 3);
        master.add(t.clone()).unwrap();
        master.move_to_backlog().unwrap();

        let err = master.add(t.clone()).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::AlreadyTracked {
                id: t.id.clone(),
                holding: Holding::Backlog,
            }
        );
        assert_eq!(master.len(), 1);
    }

    #[test]
    fn find_searches_every_area() {
        let (clock, mut master) = master();
        let closed = task("Closed", 3);
        let closed_id = closed.id.clone();
        master.add(closed).unwrap();
        master.close().unwrap();

        let queued = backlog_task(&mut master, "Queued", 3);

        let sleeper = task("Sleeper", 3);
        let sleeper_id = sleeper.id.clone();
        master.add(sleeper).unwrap();
        master.sleep(Duration::hours(1)).unwrap();

        let blocked = task("Blocked", 3);
        let blocked_id = blocked.id.clone();
        master.add(blocked).unwrap();
        master.block(queued.as_str()).unwrap();

        let active = task("Active", 3);
        let active_id = active.id.clone();
        master.add(active).unwrap();

        let holding_of = |master: &TaskMaster, id: &TaskId| master.find(id.short()).unwrap().1;
        assert_eq!(holding_of(&master, &active_id), Holding::Active);
        assert_eq!(holding_of(&master, &queued), Holding::Backlog);
        assert_eq!(holding_of(&master, &blocked_id), Holding::Blocked);
        assert_eq!(holding_of(&master, &sleeper_id), Holding::Sleeping);
        assert_eq!(holding_of(&master, &closed_id), Holding::Closed);

        assert_eq!(
            master.find("zz").unwrap_err(),
            ScheduleError::NotFound("zz".to_string())
        );
        assert!(clock.now() <= master.now());
    }

    #[test]
    fn closing_the_blocker_releases_the_blocked_task() {
        let (_clock, mut master) = master();
        let blocker = task("Blocker", 3);
        let blocker_id = blocker.id.clone();
        master.add(blocker).unwrap();

        let waiting = task("Waiting", 3);
        let waiting_id = waiting.id.clone();
        master.add(waiting).unwrap();
        master.block(blocker_id.as_str()).unwrap();
        assert_eq!(master.holding(&waiting_id), Some(Holding::Blocked));

        assert_eq!(master.current_task().unwrap().id, blocker_id);
        master.close().unwrap();

        assert_eq!(master.holding(&waiting_id), Some(Holding::Active));
        assert_eq!(master.current_task().unwrap().id, waiting_id);
    }

    #[test]
    fn multiple_blockers_must_all_resolve() {
        let (_clock, mut master) = master();
        let b1 = backlog_task(&mut master, "B1", 3);
        let b2 = backlog_task(&mut master, "B2", 3);

        let waiting = task("Waiting", 3);
        let waiting_id = waiting.id.clone();
        master.add(waiting).unwrap();
        master.block(b1.as_str()).unwrap();
        master.add_blocker(waiting_id.as_str(), b2.as_str()).unwrap();

        assert_eq!(
            master.add_blocker(waiting_id.as_str(), b2.as_str()).unwrap_err(),
            ScheduleError::DuplicateBlock {
                item: waiting_id.to_string(),
                blocker: b2.to_string(),
            }
        );

        assert!(master.unblock(&b1).is_empty());
        assert_eq!(master.holding(&waiting_id), Some(Holding::Blocked));
        assert_eq!(master.unblock(&b2), vec![waiting_id.clone()]);
        assert_eq!(master.holding(&waiting_id), Some(Holding::Active));
        assert!(master.unblock(&b2).is_empty());
    }

    #[test]
    fn block_rejects_self_and_closed_blockers() {
        let (_clock, mut master) = master();
        let done = task("Done", 3);
        let done_id = done.id.clone();
        master.add(done).unwrap();
        master.close().unwrap();

        let t = task("Top", 3);
        let id = t.id.clone();
        master.add(t).unwrap();

        assert_eq!(master.block(id.as_str()).unwrap_err(), ScheduleError::SelfBlock(id.clone()));
        assert_eq!(
            master.block(done_id.as_str()).unwrap_err(),
            ScheduleError::Unavailable {
                id: done_id,
                holding: Holding::Closed,
            }
        );
        assert_eq!(master.holding(&id), Some(Holding::Active));
    }

    #[test]
    fn block_rejects_cycles() {
        let (_clock, mut master) = master();
        let a = task("A", 3);
        let a_id = a.id.clone();
        let b = task("B", 3);
        let b_id = b.id.clone();
        master.add(a).unwrap();
        master.add(b).unwrap();

        // B waits on A, so A may not wait on B
        master.block(a_id.as_str()).unwrap();
        assert_eq!(master.current_task().unwrap().id, a_id);
        assert_eq!(
            master.block(b_id.as_str()).unwrap_err(),
            ScheduleError::BlockCycle {
                item: a_id.clone(),
                blocker: b_id.clone(),
            }
        );
        assert_eq!(master.holding(&a_id), Some(Holding::Active));

        // and not through a longer chain either
        let c = task("C", 3);
        let c_id = c.id.clone();
        master.add(c).unwrap();
        master.block(b_id.as_str()).unwrap();
        assert_eq!(master.current_task().unwrap().id, a_id);
        assert_eq!(
            master.block(c_id.as_str()).unwrap_err(),
            ScheduleError::BlockCycle {
                item: a_id.clone(),
                blocker: c_id.clone(),
            }
        );

        master.close().unwrap();
        assert_eq!(master.holding(&b_id), Some(Holding::Active));
    }

    #[test]
    fn taking_the_blocker_releases_what_it_blocked() {
        let (_clock, mut master) = master();
        let blocker = task("Blocker", 3);
        let blocker_id = blocker.id.clone();
        master.add(blocker).unwrap();

        let waiting = task("Waiting", 3);
        let waiting_id = waiting.id.clone();
        master.add(waiting).unwrap();
        master.block(blocker_id.as_str()).unwrap();

        assert_eq!(master.take_active().unwrap().id, blocker_id);
        assert_eq!(master.holding(&blocker_id), None);
        assert_eq!(master.holding(&waiting_id), Some(Holding::Active));
        assert_eq!(master.current_task().unwrap().id, waiting_id);
    }

    #[test]
    fn activate_pulls_from_backlog_and_dorm() {
        let (_clock, mut master) = master();
        let queued = backlog_task(&mut master, "Queued", 4);
        let sleeper = task("Sleeper", 3);
        let sleeper_id = sleeper.id.clone();
        master.add(sleeper).unwrap();
        master.sleep(Duration::days(1)).unwrap();

        assert_eq!(master.activate(queued.short()).unwrap(), queued);
        assert!(master.backlog().is_empty());
        assert_eq!(master.activate(sleeper_id.short()).unwrap(), sleeper_id);
        assert!(master.sleeping().is_empty());

        let active: Vec<_> = master.active().iter().map(|t| t.id.clone()).collect();
        assert_eq!(active, vec![sleeper_id, queued]);
    }

    #[test]
    fn activate_reorders_active_stack() {
        let (_clock, mut master) = master();
        let bottom = task("Bottom", 3);
        let bottom_id = bottom.id.clone();
        master.add(bottom).unwrap();
        master.add(task("Top", 3)).unwrap();

        master.activate(bottom_id.short()).unwrap();
        assert_eq!(master.current_task().unwrap().id, bottom_id);
        assert_eq!(master.active().len(), 2);
    }

    #[test]
    fn closed_tasks_cannot_be_revived() {
        let (_clock, mut master) = master();
        let t = task("Gone", 3);
        let id = t.id.clone();
        master.add(t.clone()).unwrap();
        master.close().unwrap();

        let unavailable = ScheduleError::Unavailable {
            id: id.clone(),
            holding: Holding::Closed,
        };
        assert_eq!(master.activate(id.short()).unwrap_err(), unavailable);
        assert_eq!(master.update(t.clone()).unwrap_err(), unavailable);
        assert!(matches!(master.add(t).unwrap_err(), ScheduleError::AlreadyTracked { .. }));
        assert_eq!(master.graveyard().len(), 1);
    }

    #[test]
    fn priority_change_requeues_backlog_task() {
        let (_clock, mut master) = master();
        let first = backlog_task(&mut master, "First", 3);
        let second = backlog_task(&mut master, "Second", 3);

        master.set_priority(second.short(), Priority::SHOWSTOPPER).unwrap();
        assert_eq!(master.backlog_ids(), vec![second.clone(), first.clone()]);
        assert_eq!(master.get(&second).unwrap().priority, Priority::SHOWSTOPPER);

        master.set_priority(second.short(), Priority::LOW).unwrap();
        assert_eq!(master.backlog_ids(), vec![first, second]);
    }

    #[test]
    fn dirty_tracks_added_updated_and_closed() {
        let (_clock, mut master) = master();
        let t = task("Dirty", 3);
        let id = t.id.clone();
        master.add(t).unwrap();

        let dirty = master.take_dirty();
        assert_eq!(dirty.len(), 1);
        assert!(master.take_dirty().is_empty());

        master.move_to_backlog().unwrap();
        assert!(master.take_dirty().is_empty());

        master.set_priority(id.short(), Priority::HIGH).unwrap();
        master.activate(id.short()).unwrap();
        master.close().unwrap();
        let dirty = master.take_dirty();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].is_closed());
        assert_eq!(dirty[0].priority, Priority::HIGH);
    }

    #[test]
    fn restore_rebuilds_structures() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let bottom = task("Bottom", 3);
        let top = task("Top", 3);
        let low = task("Low", 4);
        let high = task("High", 1);
        let mut done = task("Done", 3);
        done.close(Utc::now());

        let master = TaskMaster::restore(
            clock,
            vec![bottom.clone(), top.clone()],
            vec![high.clone(), low.clone()],
            vec![done.clone()],
        )
        .unwrap();

        assert_eq!(master.active_ids(), vec![bottom.id.clone(), top.id.clone()]);
        assert_eq!(master.backlog_ids(), vec![high.id, low.id]);
        assert_eq!(master.graveyard_ids(), vec![done.id]);
        assert_eq!(master.active()[0].id, top.id);
        assert_eq!(master.len(), 5);
    }

    #[test]
    fn restore_rejects_ids_in_two_areas() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let t = task("Twice", 3);
        let result = TaskMaster::restore(clock, vec![t.clone()], vec![t], vec![]);
        assert!(matches!(result, Err(ScheduleError::AlreadyTracked { .. })));
    }
}
