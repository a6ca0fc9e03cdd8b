//! Betting Tree Builder (`SPEC_FULL.md` §4.3): derives the full extensive-form
//! river betting game from a pot, a stack, and four sizing menus, using an
//! arena of nodes (`Vec<Node>` indexed by `id`) built breadth-first — grounded
//! on `pysolver_v8.py`'s `Tree.buildTree` (a `collections.deque` BFS) and on
//! the teacher's own `postflop_tree::build_tree`/`build_node` recursion,
//! generalized from owned recursive nodes to arena indices so nodes can carry
//! a `parent` back-reference without an ownership cycle (§9 design notes).

use std::collections::VecDeque;
use std::fmt;

use crate::error::{GtoError, GtoResult};
use crate::range::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    Oop,
    Ip,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::Oop => Player::Ip,
            Player::Ip => Player::Oop,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::Oop => 0,
            Player::Ip => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Oop => write!(f, "OOP"),
            Player::Ip => write!(f, "IP"),
        }
    }
}

/// One entry of a bet/raise sizing menu, parsed from an input-file token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    Pct(f64),
    AllIn,
}

/// Parses a single sizing-menu token (`§6`): any token containing `a`/`A`
/// means all-in, otherwise it's a bare percent-of-pot number.
pub fn parse_sizing_token(token: &str) -> GtoResult<SizeSpec> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(GtoError::InvalidValue(token.to_string()));
    }
    if trimmed.chars().any(|c| c == 'a' || c == 'A') {
        return Ok(SizeSpec::AllIn);
    }
    trimmed
        .parse::<f64>()
        .map(SizeSpec::Pct)
        .map_err(|_| GtoError::InvalidValue(token.to_string()))
}

pub fn parse_sizing_menu(line: &str) -> GtoResult<Vec<SizeSpec>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed.split(',').map(parse_sizing_token).collect()
}

/// A single action token, per the `SPEC_FULL.md` §3 lexicon. `Display`
/// renders exactly the wire tokens (`X`, `F`, `C`, `B50`, `BA`, `R33`, `RA`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Check,
    Fold,
    Call,
    Bet(f64),
    BetAllIn,
    Raise(f64),
    RaiseAllIn,
}

impl Action {
    pub fn is_all_in(self) -> bool {
        matches!(self, Action::BetAllIn | Action::RaiseAllIn)
    }

    pub fn is_bet_or_raise(self) -> bool {
        matches!(
            self,
            Action::Bet(_) | Action::BetAllIn | Action::Raise(_) | Action::RaiseAllIn
        )
    }

    fn fmt_pct(p: f64) -> String {
        if p.fract() == 0.0 {
            format!("{}", p as i64)
        } else {
            format!("{}", p)
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Check => write!(f, "X"),
            Action::Fold => write!(f, "F"),
            Action::Call => write!(f, "C"),
            Action::Bet(p) => write!(f, "B{}", Action::fmt_pct(*p)),
            Action::BetAllIn => write!(f, "BA"),
            Action::Raise(p) => write!(f, "R{}", Action::fmt_pct(*p)),
            Action::RaiseAllIn => write!(f, "RA"),
        }
    }
}

/// Dispatch per `SPEC_FULL.md` §9: a finite tagged variant, not inheritance.
#[derive(Debug)]
pub enum NodeKind {
    Decision {
        legal_actions: Vec<Action>,
        children: Vec<usize>,
    },
    ShowdownTerminal,
    FoldTerminal {
        folder: Player,
    },
}

#[derive(Debug)]
pub struct Node {
    pub id: usize,
    pub parent: Option<usize>,
    pub pot_size: f64,
    pub oop_stack: f64,
    pub ip_stack: f64,
    pub action_seq: Vec<Action>,
    /// The player whose range is carried on this node: the acting player
    /// for a decision node, or (for a terminal) the player that would have
    /// acted next had the hand continued — mirrors the teacher's original
    /// construction rule of always stamping "the other player's range"
    /// onto every freshly built child regardless of terminal-ness.
    pub range_owner: Player,
    pub player_range: Range,
    pub kind: NodeKind,
}

impl Node {
    pub fn to_act(&self) -> Option<Player> {
        match self.kind {
            NodeKind::Decision { .. } => Some(self.range_owner),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, NodeKind::Decision { .. })
    }

    pub fn legal_actions(&self) -> &[Action] {
        match &self.kind {
            NodeKind::Decision { legal_actions, .. } => legal_actions,
            _ => &[],
        }
    }

    pub fn child(&self, action_index: usize) -> Option<usize> {
        match &self.kind {
            NodeKind::Decision { children, .. } => children.get(action_index).copied(),
            _ => None,
        }
    }

    pub fn action_index(&self, action: Action) -> Option<usize> {
        self.legal_actions().iter().position(|&a| a == action)
    }

    /// The stack belonging to `p` at this node.
    pub fn stack_of(&self, p: Player) -> f64 {
        match p {
            Player::Oop => self.oop_stack,
            Player::Ip => self.ip_stack,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub starting_pot: f64,
    pub starting_stack: f64,
    pub oop_bets: Vec<SizeSpec>,
    pub ip_bets: Vec<SizeSpec>,
    pub oop_raises: Vec<SizeSpec>,
    pub ip_raises: Vec<SizeSpec>,
    /// `τ`, in `[0, 100]`.
    pub all_in_threshold: f64,
}

impl TreeConfig {
    fn bet_menu(&self, actor: Player) -> &[SizeSpec] {
        match actor {
            Player::Oop => &self.oop_bets,
            Player::Ip => &self.ip_bets,
        }
    }

    fn raise_menu(&self, actor: Player) -> &[SizeSpec] {
        match actor {
            Player::Oop => &self.oop_raises,
            Player::Ip => &self.ip_raises,
        }
    }
}

pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Builds the bet menu for `actor` taking the first voluntary wager into a
/// pot of `pot`, with `actor_stack` remaining — `SPEC_FULL.md` §4.3's
/// "Legal-action derivation" and "All-in predicate" for bets. The non-actor's
/// stack (`opponent_stack`) is the all-in reference cap for *bets* (the cap
/// that can be called).
fn bet_actions(menu: &[SizeSpec], pot: f64, opponent_stack: f64, tau: f64) -> Vec<Action> {
    let mut actions = vec![Action::Check];
    let mut has_all_in = false;
    for spec in menu {
        match spec {
            SizeSpec::AllIn => {
                if !has_all_in {
                    actions.push(Action::BetAllIn);
                    has_all_in = true;
                }
            }
            SizeSpec::Pct(p) => {
                let bet = p / 100.0 * pot;
                if bet > tau / 100.0 * opponent_stack {
                    if !has_all_in {
                        actions.push(Action::BetAllIn);
                        has_all_in = true;
                    }
                } else {
                    actions.push(Action::Bet(*p));
                }
            }
        }
    }
    actions
}

/// Raise menu for `actor` facing a bet of `bet_pct` percent into a pre-bet
/// pot `pot_before_bet`, with `actor_stack` remaining — the all-in predicate
/// for raises measures against the *actor's* own stack (the chips the actor
/// must commit).
fn raise_actions(menu: &[SizeSpec], pot_before_bet: f64, bet_pct: f64, actor_stack: f64, tau: f64) -> Vec<Action> {
    let mut actions = vec![Action::Fold, Action::Call];
    let mut has_all_in = false;
    for spec in menu {
        match spec {
            SizeSpec::AllIn => {
                if !has_all_in {
                    actions.push(Action::RaiseAllIn);
                    has_all_in = true;
                }
            }
            SizeSpec::Pct(p) => {
                let threshold = (pot_before_bet + 2.0 * (bet_pct / 100.0) * pot_before_bet) * (p / 100.0)
                    + (bet_pct / 100.0) * pot_before_bet;
                if threshold > tau / 100.0 * actor_stack {
                    if !has_all_in {
                        actions.push(Action::RaiseAllIn);
                        has_all_in = true;
                    }
                } else {
                    actions.push(Action::Raise(*p));
                }
            }
        }
    }
    actions
}

/// Recovers `P_parent`: the pot size immediately before the opening bet of
/// the current betting round, by walking back through `parent` links from a
/// node reached via a raise. `SPEC_FULL.md` §4.3/§9.
fn pot_before_betting_round(nodes: &[Node], raised_into_idx: usize) -> f64 {
    let mut idx = nodes[raised_into_idx]
        .parent
        .expect("a raise always has a parent");
    loop {
        let last = nodes[idx].action_seq.last().copied();
        if matches!(last, Some(Action::Bet(_)) | Some(Action::BetAllIn)) {
            break;
        }
        idx = nodes[idx].parent.expect("walked to root without an opening bet");
    }
    let before_bet = nodes[idx].parent.expect("a bet always has a parent");
    nodes[before_bet].pot_size
}

/// Chip arithmetic for one edge — `SPEC_FULL.md` §4.3 "Chip arithmetic at an
/// edge". Returns `(pot, oop_stack, ip_stack)` at the child.
fn apply_action(parent: &Node, actor: Player, action: Action) -> (f64, f64, f64) {
    let delta = (parent.oop_stack - parent.ip_stack).abs();
    match action {
        Action::Check | Action::Fold => (parent.pot_size, parent.oop_stack, parent.ip_stack),
        Action::Call => {
            let new_pot = parent.pot_size + delta;
            let equalized = parent.oop_stack.min(parent.ip_stack);
            (new_pot, equalized, equalized)
        }
        Action::Bet(p) => {
            let bet = p / 100.0 * parent.pot_size;
            let new_pot = parent.pot_size + bet;
            match actor {
                Player::Oop => (new_pot, parent.oop_stack - bet, parent.ip_stack),
                Player::Ip => (new_pot, parent.oop_stack, parent.ip_stack - bet),
            }
        }
        Action::BetAllIn => {
            let bet = parent.stack_of(actor);
            let new_pot = parent.pot_size + bet;
            match actor {
                Player::Oop => (new_pot, 0.0, parent.ip_stack),
                Player::Ip => (new_pot, parent.oop_stack, 0.0),
            }
        }
        Action::Raise(p) => {
            let raise_extra = (parent.pot_size + delta) * p / 100.0;
            let new_pot = parent.pot_size + delta + raise_extra;
            match actor {
                Player::Oop => (new_pot, parent.ip_stack - raise_extra, parent.ip_stack),
                Player::Ip => (new_pot, parent.oop_stack, parent.oop_stack - raise_extra),
            }
        }
        Action::RaiseAllIn => {
            let raise_extra = parent.oop_stack.max(parent.ip_stack) - delta;
            let new_pot = parent.pot_size + delta + raise_extra;
            match actor {
                Player::Oop => (new_pot, 0.0, parent.ip_stack),
                Player::Ip => (new_pot, parent.oop_stack, 0.0),
            }
        }
    }
}

/// Builds the full extensive-form tree breadth-first. `SPEC_FULL.md` §4.3
/// "Construction order".
pub fn build_tree(config: &TreeConfig, oop_start: &Range, ip_start: &Range) -> Tree {
    let mut nodes: Vec<Node> = Vec::new();

    let root_legal = bet_actions(
        &config.oop_bets,
        config.starting_pot,
        config.starting_stack,
        config.all_in_threshold,
    );
    let mut root_range = oop_start.fresh_copy();
    root_range.initialize_strategies(root_legal.len());
    nodes.push(Node {
        id: 0,
        parent: None,
        pot_size: config.starting_pot,
        oop_stack: config.starting_stack,
        ip_stack: config.starting_stack,
        action_seq: Vec::new(),
        range_owner: Player::Oop,
        player_range: root_range,
        kind: NodeKind::Decision {
            legal_actions: root_legal,
            children: Vec::new(),
        },
    });

    let mut queue: VecDeque<usize> = VecDeque::new();
    queue.push_back(0);

    while let Some(current_idx) = queue.pop_front() {
        let legal_actions = match &nodes[current_idx].kind {
            NodeKind::Decision { legal_actions, .. } => legal_actions.clone(),
            _ => continue,
        };
        let actor = nodes[current_idx].range_owner;

        for action in legal_actions {
            let (pot, oop_stack, ip_stack) = apply_action(&nodes[current_idx], actor, action);

            let (range_owner, kind) = match action {
                Action::Fold => (actor.opponent(), NodeKind::FoldTerminal { folder: actor }),
                Action::Call => (actor.opponent(), NodeKind::ShowdownTerminal),
                Action::Check => {
                    if actor == Player::Ip {
                        (actor.opponent(), NodeKind::ShowdownTerminal)
                    } else {
                        // OOP's opening check; IP acts next facing an
                        // unchanged pot, so IP's all-in reference cap is
                        // OOP's (the non-actor's) stack.
                        let next_actor = Player::Ip;
                        let legal = bet_actions(config.bet_menu(next_actor), pot, oop_stack, config.all_in_threshold);
                        (next_actor, NodeKind::Decision { legal_actions: legal, children: Vec::new() })
                    }
                }
                Action::Bet(_) | Action::BetAllIn => {
                    if action.is_all_in() {
                        (actor.opponent(), NodeKind::Decision { legal_actions: vec![Action::Fold, Action::Call], children: Vec::new() })
                    } else {
                        let next_actor = actor.opponent();
                        let bet_pct = match action {
                            Action::Bet(p) => p,
                            _ => unreachable!(),
                        };
                        let legal = raise_actions(
                            config.raise_menu(next_actor),
                            nodes[current_idx].pot_size,
                            bet_pct,
                            nodes[current_idx].stack_of(next_actor),
                            config.all_in_threshold,
                        );
                        (next_actor, NodeKind::Decision { legal_actions: legal, children: Vec::new() })
                    }
                }
                Action::Raise(_) | Action::RaiseAllIn => {
                    if action.is_all_in() {
                        (actor.opponent(), NodeKind::Decision { legal_actions: vec![Action::Fold, Action::Call], children: Vec::new() })
                    } else {
                        // Raise facing a raise: legal_actions is resolved
                        // below, once this node exists in the arena and
                        // `pot_before_betting_round` can walk its parents.
                        (actor.opponent(), NodeKind::Decision { legal_actions: Vec::new(), children: Vec::new() })
                    }
                }
            };

            let new_id = nodes.len();
            let mut action_seq = nodes[current_idx].action_seq.clone();
            action_seq.push(action);

            let mut player_range = match range_owner {
                Player::Oop => oop_start.fresh_copy(),
                Player::Ip => ip_start.fresh_copy(),
            };
            if let NodeKind::Decision { legal_actions, .. } = &kind {
                player_range.initialize_strategies(legal_actions.len());
            }

            nodes.push(Node {
                id: new_id,
                parent: Some(current_idx),
                pot_size: pot,
                oop_stack,
                ip_stack,
                action_seq,
                range_owner,
                player_range,
                kind,
            });

            if let NodeKind::Decision { children, .. } = &mut nodes[current_idx].kind {
                children.push(new_id);
            }

            // Raise-facing-raise needs P_parent recovered by walking back;
            // legal_actions for that case were deferred above (empty vec)
            // and are filled in now that `new_id` exists in the arena.
            if matches!(
                nodes[new_id].action_seq.last(),
                Some(Action::Raise(_))
            ) && matches!(nodes[new_id].kind, NodeKind::Decision { ref legal_actions, .. } if legal_actions.is_empty())
            {
                let p_parent = pot_before_betting_round(&nodes, new_id);
                let raise_pct = match nodes[new_id].action_seq.last() {
                    Some(Action::Raise(p)) => *p,
                    _ => unreachable!(),
                };
                let legal = raise_actions(
                    config.raise_menu(range_owner),
                    p_parent,
                    raise_pct,
                    nodes[new_id].stack_of(range_owner),
                    config.all_in_threshold,
                );
                if let NodeKind::Decision { legal_actions, .. } = &mut nodes[new_id].kind {
                    *legal_actions = legal;
                    nodes[new_id].player_range.initialize_strategies(legal_actions.len());
                }
            }

            queue.push_back(new_id);
        }
    }

    Tree { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::parse_range_line;

    fn config(pot: f64, stack: f64, tau: f64) -> TreeConfig {
        TreeConfig {
            starting_pot: pot,
            starting_stack: stack,
            oop_bets: Vec::new(),
            ip_bets: Vec::new(),
            oop_raises: Vec::new(),
            ip_raises: Vec::new(),
            all_in_threshold: tau,
        }
    }

    fn ranges() -> (Range, Range) {
        (
            parse_range_line("AsAc").unwrap(),
            parse_range_line("KsKc").unwrap(),
        )
    }

    #[test]
    fn s1_no_betting_has_three_nodes() {
        let (oop, ip) = ranges();
        let tree = build_tree(&config(10.0, 50.0, 70.0), &oop, &ip);
        assert_eq!(tree.len(), 3);
        assert!(matches!(tree.nodes[0].to_act(), Some(Player::Oop)));
        assert!(matches!(tree.nodes[1].to_act(), Some(Player::Ip)));
        assert!(tree.nodes[2].is_terminal());
        assert!(matches!(tree.nodes[2].kind, NodeKind::ShowdownTerminal));
    }

    #[test]
    fn s2_check_or_shove_legal_actions() {
        let (oop, ip) = ranges();
        let mut cfg = config(10.0, 50.0, 70.0);
        cfg.oop_bets = vec![SizeSpec::AllIn];
        let tree = build_tree(&cfg, &oop, &ip);
        let root = tree.root();
        assert_eq!(root.legal_actions().len(), 2);
        assert_eq!(root.legal_actions()[0], Action::Check);
        assert_eq!(root.legal_actions()[1], Action::BetAllIn);
    }

    #[test]
    fn s5_sizing_collapses_to_all_in() {
        let (oop, ip) = ranges();
        let mut cfg = config(10.0, 11.0, 70.0);
        cfg.oop_bets = vec![SizeSpec::Pct(100.0)];
        let tree = build_tree(&cfg, &oop, &ip);
        let root = tree.root();
        assert_eq!(root.legal_actions(), &[Action::Check, Action::BetAllIn]);
    }

    #[test]
    fn s6_deduplicates_all_ins() {
        let (oop, ip) = ranges();
        let mut cfg = config(10.0, 10.0, 50.0);
        cfg.oop_bets = vec![SizeSpec::AllIn, SizeSpec::Pct(200.0)];
        let tree = build_tree(&cfg, &oop, &ip);
        let root = tree.root();
        let all_ins = root.legal_actions().iter().filter(|a| a.is_all_in()).count();
        assert_eq!(all_ins, 1);
    }

    #[test]
    fn bet_then_fold_and_call_are_terminal() {
        let (oop, ip) = ranges();
        let mut cfg = config(10.0, 50.0, 70.0);
        cfg.oop_bets = vec![SizeSpec::Pct(50.0)];
        let tree = build_tree(&cfg, &oop, &ip);
        let root = tree.root();
        let bet_child_idx = root.child(1).unwrap();
        let bet_node = &tree.nodes[bet_child_idx];
        assert_eq!(bet_node.legal_actions()[0], Action::Fold);
        assert_eq!(bet_node.legal_actions()[1], Action::Call);
        let fold_idx = bet_node.child(0).unwrap();
        let call_idx = bet_node.child(1).unwrap();
        assert!(matches!(tree.nodes[fold_idx].kind, NodeKind::FoldTerminal { folder: Player::Ip }));
        assert!(matches!(tree.nodes[call_idx].kind, NodeKind::ShowdownTerminal));
    }

    #[test]
    fn pot_and_stacks_respect_monotonicity() {
        let (oop, ip) = ranges();
        let mut cfg = config(10.0, 50.0, 70.0);
        cfg.oop_bets = vec![SizeSpec::Pct(50.0)];
        cfg.ip_raises = vec![SizeSpec::Pct(50.0)];
        let tree = build_tree(&cfg, &oop, &ip);
        for node in &tree.nodes {
            assert!(node.pot_size >= cfg.starting_pot - 1e-9);
            assert!(node.oop_stack >= -1e-9);
            assert!(node.ip_stack >= -1e-9);
            assert!(node.oop_stack <= cfg.starting_stack + 1e-9);
            assert!(node.ip_stack <= cfg.starting_stack + 1e-9);
        }
    }

    #[test]
    fn legal_action_lists_never_mix_check_and_fold_call() {
        let (oop, ip) = ranges();
        let mut cfg = config(10.0, 50.0, 70.0);
        cfg.oop_bets = vec![SizeSpec::Pct(50.0)];
        cfg.ip_bets = vec![SizeSpec::Pct(50.0)];
        cfg.oop_raises = vec![SizeSpec::Pct(50.0)];
        cfg.ip_raises = vec![SizeSpec::Pct(50.0)];
        let tree = build_tree(&cfg, &oop, &ip);
        for node in &tree.nodes {
            if let NodeKind::Decision { legal_actions, .. } = &node.kind {
                let starts_with_check = legal_actions[0] == Action::Check;
                let starts_with_fold_call =
                    legal_actions.len() >= 2 && legal_actions[0] == Action::Fold && legal_actions[1] == Action::Call;
                assert!(starts_with_check || starts_with_fold_call);
                let all_in_count = legal_actions.iter().filter(|a| a.is_all_in()).count();
                assert!(all_in_count <= 1);
            }
        }
    }
}
