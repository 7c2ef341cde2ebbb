//! The blocks a user has created, where they are, and the variables they
//! depend on.

use crate::{
    config::ScaleConfig,
    env::{Environment, VariableError},
    expr::Expression,
    ops::{self, Evaluation, InvalidExpression},
    scale::{self, ScaleReading},
    solve::{self, SolveOutcome},
};
use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Uniquely identifies a [`Block`] within a [`Workspace`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The places a [`Block`] can sit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Blocks which aren't on the scale.
    Bench,
    Left,
    Right,
}

/// An expression typed by the user, along with its most recent value.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    text: String,
    expression: Expression,
    value: Evaluation,
}

impl Block {
    pub fn id(&self) -> BlockId { self.id }

    /// The text exactly as the user typed it.
    pub fn text(&self) -> &str { &self.text }

    pub fn expression(&self) -> &Expression { &self.expression }

    pub fn value(&self) -> Evaluation { self.value }

    /// The block's expression in hand-written notation, e.g. `2x + ³√8`.
    pub fn display_text(&self) -> String {
        self.expression.pretty().to_string()
    }

    /// What to show alongside the block's text.
    pub fn badge(&self) -> Badge {
        match self.value {
            Evaluation::Value(value) if !value.is_nan() => {
                if self.text.trim() == value.to_string() {
                    Badge::Literal
                } else {
                    Badge::Computed(value)
                }
            },
            _ => Badge::Undefined,
        }
    }

    /// Re-evaluate against `env`, returning `true` if the cached value
    /// changed.
    ///
    /// Going from one NaN to another (e.g. a missing variable becoming `0/0`)
    /// isn't considered a change.
    fn refresh(&mut self, env: &Environment) -> bool {
        let value = ops::evaluate(&self.expression, env);
        let unchanged =
            value == self.value || (value.is_nan() && self.value.is_nan());

        if unchanged {
            false
        } else {
            self.value = value;
            true
        }
    }
}

/// A hint for how a [`Block`] should be decorated.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Badge {
    /// The block needs a variable which hasn't been defined.
    Undefined,
    /// The block is just a number, so there is nothing extra to show.
    Literal,
    /// The block's text evaluates to this.
    Computed(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceError {
    UnknownBlock(BlockId),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::UnknownBlock(id) => {
                write!(f, "There is no block with ID {}", id)
            },
        }
    }
}

impl Error for WorkspaceError {}

/// Owns every [`Block`], the [`Zone`] each one is in, and the variables
/// they're evaluated against.
///
/// Changing a variable synchronously re-evaluates every block.
#[derive(Debug, Default, Clone)]
pub struct Workspace {
    blocks: HashMap<BlockId, Block>,
    bench: Vec<BlockId>,
    left: Vec<BlockId>,
    right: Vec<BlockId>,
    variables: Environment,
    config: ScaleConfig,
    last_id: u64,
}

impl Workspace {
    pub fn new() -> Self { Workspace::default() }

    pub fn with_config(config: ScaleConfig) -> Self {
        Workspace {
            config,
            ..Workspace::default()
        }
    }

    pub fn config(&self) -> &ScaleConfig { &self.config }

    pub fn variables(&self) -> &Environment { &self.variables }

    pub fn block(&self, id: BlockId) -> Option<&Block> { self.blocks.get(&id) }

    pub fn len(&self) -> usize { self.blocks.len() }

    pub fn is_empty(&self) -> bool { self.blocks.is_empty() }

    /// The blocks in a [`Zone`], in the order they were put there.
    pub fn blocks_in(&self, zone: Zone) -> impl Iterator<Item = &Block> + '_ {
        self.zone(zone)
            .iter()
            .filter_map(move |id| self.blocks.get(id))
    }

    pub fn zone_of(&self, id: BlockId) -> Option<Zone> {
        [Zone::Bench, Zone::Left, Zone::Right]
            .iter()
            .copied()
            .find(|&zone| self.zone(zone).contains(&id))
    }

    /// Create a new block on the bench.
    ///
    /// Text which can't be evaluated is rejected and nothing is added.
    pub fn create_block(&mut self, text: &str) -> Result<BlockId, InvalidExpression> {
        let expression = ops::compile(text)?;
        let value = ops::evaluate(&expression, &self.variables);

        self.last_id += 1;
        let id = BlockId(self.last_id);

        tracing::debug!(%id, text, ?value, "Created a block");

        self.blocks.insert(
            id,
            Block {
                id,
                text: text.to_string(),
                expression,
                value,
            },
        );
        self.bench.push(id);

        Ok(id)
    }

    /// Move a block to the end of another zone. Moving a block to the zone
    /// it is already in does nothing.
    pub fn move_block(&mut self, id: BlockId, to: Zone) -> Result<(), WorkspaceError> {
        let from = self.zone_of(id).ok_or(WorkspaceError::UnknownBlock(id))?;

        if from != to {
            self.zone_mut(from).retain(|&other| other != id);
            self.zone_mut(to).push(id);
            tracing::debug!(%id, ?from, ?to, "Moved a block");
        }

        Ok(())
    }

    pub fn delete_block(&mut self, id: BlockId) -> Option<Block> {
        let block = self.blocks.remove(&id)?;

        for zone in [&mut self.bench, &mut self.left, &mut self.right] {
            zone.retain(|&other| other != id);
        }

        tracing::debug!(%id, "Deleted a block");

        Some(block)
    }

    /// Give a variable a value and re-evaluate every block, returning the
    /// number of blocks whose value changed.
    pub fn define_variable(
        &mut self,
        name: &str,
        value: f64,
    ) -> Result<usize, VariableError> {
        self.variables.define(name, value)?;
        tracing::debug!(name = name.trim(), value, "Defined a variable");

        Ok(self.recompute())
    }

    /// Forget about a variable, returning its old value (if there was one).
    pub fn remove_variable(&mut self, name: &str) -> Option<f64> {
        let old_value = self.variables.remove(name)?;
        tracing::debug!(name = name.trim(), old_value, "Removed a variable");
        self.recompute();

        Some(old_value)
    }

    /// Get rid of every block and variable.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.bench.clear();
        self.left.clear();
        self.right.clear();
        self.variables.clear();
    }

    /// Re-evaluate every block against the current variables, returning the
    /// number of blocks whose cached value changed.
    ///
    /// Running this twice in a row leaves every block untouched the second
    /// time.
    pub fn recompute(&mut self) -> usize {
        let variables = &self.variables;
        let mut changed = 0;

        for block in self.blocks.values_mut() {
            if block.refresh(variables) {
                tracing::trace!(id = %block.id, value = ?block.value, "Block changed");
                changed += 1;
            }
        }

        changed
    }

    /// Work out the value of the single unknown variable which would balance
    /// the scale, without changing anything.
    pub fn solve(&self) -> SolveOutcome {
        solve::solve_with(
            self.blocks_in(Zone::Left).map(Block::expression),
            self.blocks_in(Zone::Right).map(Block::expression),
            &self.variables,
            &self.config,
        )
    }

    /// [`Workspace::solve()`] the scale and, if that worked, store the
    /// variable's new value.
    pub fn balance(&mut self) -> Result<SolveOutcome, VariableError> {
        let outcome = self.solve();

        if let SolveOutcome::Solved { unknown, value } = &outcome {
            self.define_variable(unknown.name(), *value)?;
        }

        Ok(outcome)
    }

    /// Weigh the two pans.
    pub fn reading(&self) -> ScaleReading {
        scale::read_with(
            self.blocks_in(Zone::Left).map(Block::value),
            self.blocks_in(Zone::Right).map(Block::value),
            &self.config,
        )
    }

    fn zone(&self, zone: Zone) -> &Vec<BlockId> {
        match zone {
            Zone::Bench => &self.bench,
            Zone::Left => &self.left,
            Zone::Right => &self.right,
        }
    }

    fn zone_mut(&mut self, zone: Zone) -> &mut Vec<BlockId> {
        match zone {
            Zone::Bench => &mut self.bench,
            Zone::Left => &mut self.left,
            Zone::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::Parameter, scale::Relation};

    fn workspace_with(left: &[&str], right: &[&str]) -> Workspace {
        let mut workspace = Workspace::new();

        for (texts, zone) in &[(left, Zone::Left), (right, Zone::Right)] {
            for text in texts.iter() {
                let id = workspace.create_block(text).unwrap();
                workspace.move_block(id, *zone).unwrap();
            }
        }

        workspace
    }

    fn texts(workspace: &Workspace, zone: Zone) -> Vec<&str> {
        workspace.blocks_in(zone).map(Block::text).collect()
    }

    #[test]
    fn new_blocks_go_on_the_bench() {
        let mut workspace = Workspace::new();

        let first = workspace.create_block("2x").unwrap();
        let second = workspace.create_block("5").unwrap();

        assert_ne!(first, second);
        assert_eq!(texts(&workspace, Zone::Bench), vec!["2x", "5"]);
        assert_eq!(workspace.zone_of(first), Some(Zone::Bench));
        assert_eq!(workspace.block(first).unwrap().value(), Evaluation::Undefined);
        assert_eq!(workspace.block(second).unwrap().value(), Evaluation::Value(5.0));
    }

    #[test]
    fn invalid_text_never_becomes_a_block() {
        let mut workspace = Workspace::new();

        assert!(workspace.create_block("2x; drop()").is_err());
        assert!(workspace.create_block("(1 + 2").is_err());
        assert!(workspace.create_block("   ").is_err());

        assert!(workspace.is_empty());
        assert_eq!(workspace.blocks_in(Zone::Bench).count(), 0);
    }

    #[test]
    fn moving_blocks_between_zones() {
        let mut workspace = Workspace::new();
        let a = workspace.create_block("1").unwrap();
        let b = workspace.create_block("2").unwrap();
        let c = workspace.create_block("3").unwrap();

        workspace.move_block(b, Zone::Left).unwrap();
        workspace.move_block(a, Zone::Left).unwrap();
        workspace.move_block(c, Zone::Right).unwrap();
        // already there
        workspace.move_block(c, Zone::Right).unwrap();

        assert_eq!(texts(&workspace, Zone::Left), vec!["2", "1"]);
        assert_eq!(texts(&workspace, Zone::Right), vec!["3"]);
        assert!(texts(&workspace, Zone::Bench).is_empty());

        workspace.move_block(b, Zone::Bench).unwrap();

        assert_eq!(workspace.zone_of(b), Some(Zone::Bench));
        assert_eq!(texts(&workspace, Zone::Left), vec!["1"]);
    }

    #[test]
    fn moving_an_unknown_block_fails() {
        let mut workspace = Workspace::new();
        let id = workspace.create_block("1").unwrap();
        workspace.delete_block(id).unwrap();

        let got = workspace.move_block(id, Zone::Left);

        assert_eq!(got, Err(WorkspaceError::UnknownBlock(id)));
    }

    #[test]
    fn deleting_removes_the_block_everywhere() {
        let mut workspace = workspace_with(&["x", "1"], &["2"]);
        let id = workspace.blocks_in(Zone::Left).next().unwrap().id();

        let deleted = workspace.delete_block(id).unwrap();

        assert_eq!(deleted.text(), "x");
        assert_eq!(workspace.zone_of(id), None);
        assert_eq!(texts(&workspace, Zone::Left), vec!["1"]);
        assert_eq!(workspace.len(), 2);
        assert!(workspace.delete_block(id).is_none());
    }

    #[test]
    fn defining_a_variable_updates_the_blocks() {
        let mut workspace = workspace_with(&["2x"], &["10", "y"]);

        let changed = workspace.define_variable("x", 5.0).unwrap();

        assert_eq!(changed, 1);
        let left: Vec<_> =
            workspace.blocks_in(Zone::Left).map(Block::value).collect();
        assert_eq!(left, vec![Evaluation::Value(10.0)]);

        let removed = workspace.remove_variable("x");

        assert_eq!(removed, Some(5.0));
        let left: Vec<_> =
            workspace.blocks_in(Zone::Left).map(Block::value).collect();
        assert_eq!(left, vec![Evaluation::Undefined]);
        assert_eq!(workspace.remove_variable("x"), None);
    }

    #[test]
    fn variable_names_are_trimmed() {
        let mut workspace = workspace_with(&["x"], &[]);

        workspace.define_variable(" x ", 1.0).unwrap();
        let removed = workspace.remove_variable(" x ");

        assert_eq!(removed, Some(1.0));
        assert!(workspace.variables().is_empty());
        assert_eq!(
            workspace.blocks_in(Zone::Left).next().unwrap().value(),
            Evaluation::Undefined
        );
    }

    #[test]
    fn bad_variables_are_rejected() {
        let mut workspace = workspace_with(&["x"], &[]);

        assert!(workspace.define_variable("1x", 5.0).is_err());
        assert!(workspace.define_variable("x", f64::NAN).is_err());
        assert!(workspace.variables().is_empty());
    }

    #[test]
    fn recomputing_twice_changes_nothing_the_second_time() {
        let mut workspace =
            workspace_with(&["2x", "0/0", "1/0", "y"], &["x/3", "root(-8, 3)"]);
        workspace.define_variable("x", 1.5).unwrap();

        let snapshot = |workspace: &Workspace| -> Vec<(BlockId, u64, bool)> {
            let mut values: Vec<_> = [Zone::Left, Zone::Right]
                .iter()
                .flat_map(|&zone| workspace.blocks_in(zone))
                .map(|b| {
                    let value = b.value();
                    (b.id(), value.as_f64().to_bits(), value.value().is_none())
                })
                .collect();
            values.sort();
            values
        };

        let before = snapshot(&workspace);
        let first = workspace.recompute();
        let after_first = snapshot(&workspace);
        let second = workspace.recompute();
        let after_second = snapshot(&workspace);

        assert_eq!(first, 0);
        assert_eq!(second, 0);
        assert_eq!(before, after_first);
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn one_nan_replacing_another_isnt_a_change() {
        let mut workspace = workspace_with(&["x/x"], &[]);
        assert_eq!(
            workspace.blocks_in(Zone::Left).next().unwrap().value(),
            Evaluation::Undefined
        );

        // 0/0 is NaN, which reads the same as undefined
        let changed = workspace.define_variable("x", 0.0).unwrap();

        assert_eq!(changed, 0);
        assert_eq!(
            workspace.blocks_in(Zone::Left).next().unwrap().value(),
            Evaluation::Undefined
        );

        let changed = workspace.define_variable("x", 2.0).unwrap();

        assert_eq!(changed, 1);
    }

    #[test]
    fn balancing_defines_the_unknown() {
        let mut workspace = workspace_with(&["x", "3"], &["10"]);
        assert!(workspace.reading().has_undefined);

        let outcome = workspace.balance().unwrap();

        assert_eq!(
            outcome,
            SolveOutcome::Solved {
                unknown: Parameter::named("x"),
                value: 7.0
            }
        );
        assert_eq!(workspace.variables().get("x"), Some(7.0));
        let reading = workspace.reading();
        assert!(!reading.has_undefined);
        assert_eq!(reading.relation, Relation::Balanced);
        assert_eq!(reading.left_total, 10.0);
        assert_eq!(reading.right_total, 10.0);
    }

    #[test]
    fn failed_balancing_changes_nothing() {
        let mut workspace = workspace_with(&["x + 1"], &["x"]);

        let outcome = workspace.balance().unwrap();

        assert_eq!(outcome, SolveOutcome::NoSolution(Parameter::named("x")));
        assert!(workspace.variables().is_empty());

        let mut empty = Workspace::new();
        empty.create_block("x").unwrap();
        assert_eq!(empty.solve(), SolveOutcome::NoBlocksOnScale);
    }

    #[test]
    fn bench_blocks_dont_count() {
        let mut workspace = workspace_with(&["4"], &["1"]);
        workspace.create_block("100").unwrap();
        workspace.create_block("z").unwrap();

        let reading = workspace.reading();

        assert_eq!(reading.relation, Relation::LeftHeavier);
        assert_eq!(reading.left_total, 4.0);
        assert_eq!(reading.right_total, 1.0);
        assert!(!reading.has_undefined);
    }

    #[test]
    fn readings_use_the_workspace_config() {
        let config = ScaleConfig::default().with_balance_epsilon(0.5);
        let mut workspace = Workspace::with_config(config);
        for (text, zone) in &[("0.1+0.2", Zone::Left), ("0.6", Zone::Right)] {
            let id = workspace.create_block(text).unwrap();
            workspace.move_block(id, *zone).unwrap();
        }

        assert_eq!(workspace.config(), &config);
        assert_eq!(workspace.reading().relation, Relation::Balanced);
        assert_eq!(
            Workspace::new().config().balance_epsilon,
            ScaleConfig::default().balance_epsilon
        );
    }

    #[test]
    fn solving_uses_the_workspace_config() {
        let config = ScaleConfig::default().with_decimal_places(1);
        let mut workspace = Workspace::with_config(config);
        for (text, zone) in &[("3x", Zone::Left), ("10", Zone::Right)] {
            let id = workspace.create_block(text).unwrap();
            workspace.move_block(id, *zone).unwrap();
        }

        let outcome = workspace.balance().unwrap();

        assert_eq!(
            outcome,
            SolveOutcome::Solved {
                unknown: Parameter::named("x"),
                value: 3.3
            }
        );
    }

    #[test]
    fn overflowing_expressions_dont_break_balancing() {
        let mut workspace = workspace_with(&["10^308", "10^308"], &["x"]);

        let outcome = workspace.balance().unwrap();

        assert_eq!(outcome, SolveOutcome::NoSolution(Parameter::named("x")));
        assert!(workspace.variables().is_empty());
    }

    #[test]
    fn deeply_nested_text_is_rejected() {
        let mut workspace = Workspace::new();
        let parens = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        let negations = format!("{}1", "-".repeat(10_000));
        let radicals = format!("{}16", "√".repeat(10_000));

        for text in &[parens, negations, radicals] {
            assert!(workspace.create_block(text).is_err());
        }

        assert!(workspace.is_empty());
    }

    #[test]
    fn blocks_can_be_shown_in_hand_written_notation() {
        let mut workspace = Workspace::new();
        let id = workspace
            .create_block("2x + root(8, 3) - log(8, 2)/π")
            .unwrap();

        let got = workspace.block(id).unwrap().display_text();

        assert_eq!(got, "2x + ³√8 - log₂(8)÷π");
    }

    #[test]
    fn reset_clears_everything() {
        let mut workspace = workspace_with(&["x"], &["1"]);
        workspace.define_variable("x", 1.0).unwrap();

        workspace.reset();

        assert!(workspace.is_empty());
        assert!(workspace.variables().is_empty());
        assert_eq!(workspace.solve(), SolveOutcome::NoBlocksOnScale);
    }

    #[test]
    fn badges() {
        let mut workspace = Workspace::new();
        let literal = workspace.create_block(" 5 ").unwrap();
        let computed = workspace.create_block("2 + 3").unwrap();
        let decimal = workspace.create_block("5.0").unwrap();
        let undefined = workspace.create_block("2y").unwrap();
        let nan = workspace.create_block("0/0").unwrap();

        let badge = |id| workspace.block(id).unwrap().badge();

        assert_eq!(badge(literal), Badge::Literal);
        assert_eq!(badge(computed), Badge::Computed(5.0));
        assert_eq!(badge(decimal), Badge::Computed(5.0));
        assert_eq!(badge(undefined), Badge::Undefined);
        assert_eq!(badge(nan), Badge::Undefined);
    }
}
