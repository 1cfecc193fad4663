use crate::todos::repo_types::{Level, Task};

/// The four Eisenhower quadrants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    DoFirst,
    Schedule,
    Delegate,
    DontDo,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::DoFirst,
        Quadrant::Schedule,
        Quadrant::Delegate,
        Quadrant::DontDo,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Quadrant::DoFirst => "Do First (Urgent & Important)",
            Quadrant::Schedule => "Schedule (Not Urgent & Important)",
            Quadrant::Delegate => "Delegate (Urgent & Not Important)",
            Quadrant::DontDo => "Don't Do (Not Urgent & Not Important)",
        }
    }

    /// `None` when either axis is `NORMAL`.
    pub fn of(urgency: Level, importance: Level) -> Option<Self> {
        match (urgency, importance) {
            (Level::High, Level::High) => Some(Quadrant::DoFirst),
            (Level::Low, Level::High) => Some(Quadrant::Schedule),
            (Level::High, Level::Low) => Some(Quadrant::Delegate),
            (Level::Low, Level::Low) => Some(Quadrant::DontDo),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Tasks grouped by quadrant. Tasks with a `NORMAL` urgency or importance belong to no
/// quadrant and are kept apart in [`EisenhowerMatrix::unplaced`].
#[derive(Debug, Default)]
pub struct EisenhowerMatrix<'a> {
    quadrants: [Vec<&'a Task>; 4],
    unplaced: Vec<&'a Task>,
}

impl<'a> EisenhowerMatrix<'a> {
    pub fn partition(tasks: &'a [Task]) -> Self {
        let mut m = Self::default();
        for task in tasks {
            match Quadrant::of(task.urgency, task.importance) {
                Some(q) => m.quadrants[q.index()].push(task),
                None => m.unplaced.push(task),
            }
        }
        m
    }

    pub fn quadrant(&self, q: Quadrant) -> &[&'a Task] {
        &self.quadrants[q.index()]
    }

    pub fn unplaced(&self) -> &[&'a Task] {
        &self.unplaced
    }
}
