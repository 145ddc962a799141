//! Toroidal grid primitives: positions, headings, relative actions, and
//! wrap-aware distance math.
//!
//! The grid wraps on both axes, so every delta and distance in this module
//! takes the shorter of the direct and wrap-around paths. There is no wall:
//! the only collision that exists is the agent running into its own body.

/// A cell position on the grid.
///
/// Coordinates use screen orientation: x grows to the right, y grows
/// downward, so `Heading::Up` is `(0, -1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wrap both coordinates into `[0, size)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridmind::grid::Pos;
    ///
    /// assert_eq!(Pos::new(-1, 10).wrapped(10), Pos::new(9, 0));
    /// assert_eq!(Pos::new(3, 7).wrapped(10), Pos::new(3, 7));
    /// ```
    #[inline]
    pub fn wrapped(self, size: i32) -> Self {
        Self {
            x: ((self.x % size) + size) % size,
            y: ((self.y % size) + size) % size,
        }
    }
}

/// Absolute movement direction of the agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Heading {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Heading {
    /// Unit step vector for this heading (screen coordinates).
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::Up => (0, -1),
            Heading::Right => (1, 0),
            Heading::Down => (0, 1),
            Heading::Left => (-1, 0),
        }
    }

    /// Heading after a 90-degree left turn.
    #[inline]
    pub fn turned_left(self) -> Heading {
        match self {
            Heading::Up => Heading::Left,
            Heading::Left => Heading::Down,
            Heading::Down => Heading::Right,
            Heading::Right => Heading::Up,
        }
    }

    /// Heading after a 90-degree right turn.
    #[inline]
    pub fn turned_right(self) -> Heading {
        match self {
            Heading::Up => Heading::Right,
            Heading::Right => Heading::Down,
            Heading::Down => Heading::Left,
            Heading::Left => Heading::Up,
        }
    }
}

/// A relative steering action, the agent's entire output alphabet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    Straight = 0,
    Left = 1,
    Right = 2,
}

/// Number of discrete actions.
pub const NUM_ACTIONS: usize = 3;

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Straight, Action::Left, Action::Right];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`Action::index`]. Returns `None` for out-of-range indices.
    #[inline]
    pub fn from_index(index: usize) -> Option<Action> {
        match index {
            0 => Some(Action::Straight),
            1 => Some(Action::Left),
            2 => Some(Action::Right),
            _ => None,
        }
    }

    /// Resulting heading when this action is applied to `heading`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridmind::grid::{Action, Heading};
    ///
    /// assert_eq!(Action::Straight.apply(Heading::Up), Heading::Up);
    /// assert_eq!(Action::Left.apply(Heading::Up), Heading::Left);
    /// assert_eq!(Action::Right.apply(Heading::Up), Heading::Right);
    /// ```
    #[inline]
    pub fn apply(self, heading: Heading) -> Heading {
        match self {
            Action::Straight => heading,
            Action::Left => heading.turned_left(),
            Action::Right => heading.turned_right(),
        }
    }
}

/// Raw environment state for one tick, as supplied by the host each cycle.
///
/// `body[0]` is the head. The agent never reads ambient state; everything it
/// observes arrives through this value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardState {
    /// Body segments, head first.
    pub body: Vec<Pos>,
    /// Current target cell.
    pub target: Pos,
    /// Current absolute heading.
    pub heading: Heading,
    /// Grid side length.
    pub size: i32,
}

impl BoardState {
    #[inline]
    pub fn head(&self) -> Pos {
        self.body[0]
    }
}

/// Signed wrapped delta from `from` to `to` along one axis, normalized by
/// the grid size. The result is in `[-0.5, 0.5]`.
#[inline]
pub fn wrapped_delta(from: i32, to: i32, size: i32) -> f32 {
    let direct = (to - from) as f32;
    let half = size as f32 / 2.0;
    let wrapped = if direct > half {
        direct - size as f32
    } else if direct < -half {
        direct + size as f32
    } else {
        direct
    };
    wrapped / size as f32
}

/// Unsigned wrapped gap between two coordinates along one axis.
#[inline]
pub fn wrapped_axis_gap(a: i32, b: i32, size: i32) -> i32 {
    let direct = (b - a).abs();
    direct.min(size - direct)
}

/// Wrapped Manhattan distance between two cells.
///
/// # Examples
///
/// ```
/// use gridmind::grid::{Pos, wrapped_manhattan};
///
/// // Direct path.
/// assert_eq!(wrapped_manhattan(Pos::new(5, 5), Pos::new(7, 7), 10), 4);
/// // Wrapping is shorter on both axes.
/// assert_eq!(wrapped_manhattan(Pos::new(0, 0), Pos::new(9, 9), 10), 2);
/// ```
#[inline]
pub fn wrapped_manhattan(a: Pos, b: Pos, size: i32) -> i32 {
    wrapped_axis_gap(a.x, b.x, size) + wrapped_axis_gap(a.y, b.y, size)
}

/// Wrapped Euclidean distance between two cells.
#[inline]
pub fn wrapped_euclidean(a: Pos, b: Pos, size: i32) -> f32 {
    let dx = wrapped_axis_gap(a.x, b.x, size) as f32;
    let dy = wrapped_axis_gap(a.y, b.y, size) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Whether a cell sits within one cell of any grid edge.
///
/// With a wrapping grid the border is not a hazard; this flag exists so the
/// encoder and reward model can recognize positions where wrapping around is
/// about to pay off.
#[inline]
pub fn near_border(p: Pos, size: i32) -> bool {
    p.x <= 1 || p.x >= size - 2 || p.y <= 1 || p.y >= size - 2
}
