//! Property-based tests for move elimination.
//!
//! Random well-formed functions are generated from a small recipe language
//! (a stack of live owned values manipulated by steps, optionally splitting
//! into two arms). For each one we check:
//! 1. Verification: input and output pass the ownership verifier.
//! 2. Idempotence: a second run erases nothing and changes nothing.
//! 3. Soundness: a move is erased exactly when its tuples match.
//! 4. Conservativeness: moves of payload-free enums always survive.
//! 5. Structure: only moves disappear; everything else keeps its order.

#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use ossa_ir::{
    verify_function, Function, FunctionBuilder, InstId, InstKind, Name, OwnershipKind, Ty,
    ValueId,
};
use ossa_opt::{eliminate_redundant_moves_with_decisions, MoveOutcome};
use proptest::prelude::*;

// -- Recipe --

#[derive(Clone, Debug)]
enum Step {
    Move { pick: usize, lexical: bool },
    Escape { pick: usize },
    Observe { pick: usize },
    Copy { pick: usize },
    Borrow { pick: usize },
    Wrap { pick: usize },
    Construct { pick: usize },
    Destroy { pick: usize },
    PayloadFreeEnum,
}

#[derive(Clone, Debug)]
struct Recipe {
    params: Vec<bool>,
    prefix: Vec<Step>,
    arms: Option<(Vec<Step>, Vec<Step>)>,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let pick = 0..8usize;
    prop_oneof![
        4 => (pick.clone(), any::<bool>()).prop_map(|(pick, lexical)| Step::Move { pick, lexical }),
        2 => pick.clone().prop_map(|pick| Step::Escape { pick }),
        1 => pick.clone().prop_map(|pick| Step::Observe { pick }),
        1 => pick.clone().prop_map(|pick| Step::Copy { pick }),
        1 => pick.clone().prop_map(|pick| Step::Borrow { pick }),
        1 => pick.clone().prop_map(|pick| Step::Wrap { pick }),
        1 => pick.clone().prop_map(|pick| Step::Construct { pick }),
        1 => pick.prop_map(|pick| Step::Destroy { pick }),
        1 => Just(Step::PayloadFreeEnum),
    ]
}

fn recipe_strategy() -> impl Strategy<Value = Recipe> {
    (
        prop::collection::vec(any::<bool>(), 1..4),
        prop::collection::vec(step_strategy(), 0..24),
        prop::option::of((
            prop::collection::vec(step_strategy(), 0..12),
            prop::collection::vec(step_strategy(), 0..12),
        )),
    )
        .prop_map(|(params, prefix, arms)| Recipe {
            params,
            prefix,
            arms,
        })
}

// -- Construction --

fn klass() -> Ty {
    Ty::new(Name::from_raw(1))
}

fn bool_ty() -> Ty {
    Ty::new(Name::from_raw(2))
}

fn callee() -> Name {
    Name::from_raw(3)
}

fn apply_steps(b: &mut FunctionBuilder, live: &mut Vec<ValueId>, steps: &[Step]) {
    for step in steps {
        if let Step::PayloadFreeEnum = step {
            live.push(b.enum_value(Name::from_raw(20), None, klass(), OwnershipKind::Owned));
            continue;
        }
        if live.is_empty() {
            continue;
        }
        match *step {
            Step::Move { pick, lexical } => {
                let i = pick % live.len();
                live[i] = b.move_value(live[i], lexical);
            }
            Step::Escape { pick } => {
                let raw = b.unmanaged_escape(live[pick % live.len()]);
                b.apply(callee(), &[raw], bool_ty(), OwnershipKind::Trivial);
            }
            Step::Observe { pick } => {
                b.apply(callee(), &[live[pick % live.len()]], bool_ty(), OwnershipKind::Trivial);
            }
            Step::Copy { pick } => {
                let copy = b.copy_value(live[pick % live.len()]);
                live.push(copy);
            }
            Step::Borrow { pick } => {
                let borrowed = b.begin_borrow(live[pick % live.len()]);
                b.apply(callee(), &[borrowed], bool_ty(), OwnershipKind::Trivial);
                b.end_borrow(borrowed);
            }
            Step::Wrap { pick } => {
                let i = pick % live.len();
                live[i] = b.enum_value(Name::from_raw(21), Some(live[i]), klass(), OwnershipKind::Owned);
            }
            Step::Construct { pick } => {
                let i = pick % live.len();
                live[i] = b.construct(&[live[i]], klass());
            }
            Step::Destroy { pick } => {
                let value = live.remove(pick % live.len());
                b.destroy(value);
            }
            Step::PayloadFreeEnum => {}
        }
    }
}

/// Consume whatever is live: return the last value, destroy the rest.
fn finish_path(b: &mut FunctionBuilder, mut live: Vec<ValueId>) {
    let returned = live.pop();
    for value in live {
        b.destroy(value);
    }
    b.ret(returned);
}

fn build(recipe: &Recipe) -> Function {
    let mut b = FunctionBuilder::new(Name::from_raw(4));
    let mut live: Vec<ValueId> = recipe
        .params
        .iter()
        .map(|&lexical| b.param(klass(), OwnershipKind::Owned, lexical))
        .collect();
    apply_steps(&mut b, &mut live, &recipe.prefix);

    match &recipe.arms {
        None => finish_path(&mut b, live),
        Some((then_steps, else_steps)) => {
            let cond = b.apply(callee(), &[], bool_ty(), OwnershipKind::Trivial);
            let then_block = b.create_block();
            let else_block = b.create_block();
            b.branch(cond, then_block, else_block);
            for (block, steps) in [(then_block, then_steps), (else_block, else_steps)] {
                b.switch_to(block);
                let mut arm_live = live.clone();
                apply_steps(&mut b, &mut arm_live, steps);
                finish_path(&mut b, arm_live);
            }
        }
    }
    b.finish()
}

fn non_moves(func: &Function) -> Vec<InstId> {
    func.insts_in_order()
        .filter(|&inst| !func.inst(inst).is_move())
        .collect()
}

fn is_payload_free_enum(func: &Function, value: ValueId) -> bool {
    func.defining_inst(value)
        .is_some_and(|inst| matches!(func.inst(inst), InstKind::Enum { payload: None, .. }))
}

// -- Properties --

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    /// Generated input and transformed output both verify.
    #[test]
    fn prop_output_verifies(recipe in recipe_strategy()) {
        let mut func = build(&recipe);
        prop_assert_eq!(verify_function(&func), Ok(()));
        eliminate_redundant_moves_with_decisions(&mut func);
        prop_assert_eq!(verify_function(&func), Ok(()));
    }

    /// Running twice equals running once.
    #[test]
    fn prop_idempotent(recipe in recipe_strategy()) {
        let mut func = build(&recipe);
        eliminate_redundant_moves_with_decisions(&mut func);
        let once = func.clone();
        let second = eliminate_redundant_moves_with_decisions(&mut func);
        prop_assert_eq!(second.eliminated, 0);
        prop_assert_eq!(func, once);
    }

    /// Erased exactly when the characteristics agree; never on an
    /// unattributable source.
    #[test]
    fn prop_decisions_match_tuples(recipe in recipe_strategy()) {
        let mut func = build(&recipe);
        let report = eliminate_redundant_moves_with_decisions(&mut func);

        let mut removed = 0;
        for decision in &report.decisions {
            match decision.outcome {
                MoveOutcome::Removed { old, new } => {
                    prop_assert_eq!(old, new);
                    prop_assert!(!is_payload_free_enum(&func, decision.source));
                    prop_assert!(func.is_erased(decision.inst));
                    removed += 1;
                }
                MoveOutcome::Kept { old, new } => {
                    prop_assert_ne!(old, new);
                    prop_assert!(!func.is_erased(decision.inst));
                }
                MoveOutcome::Indeterminate(_) => {
                    prop_assert!(!func.is_erased(decision.inst));
                }
            }
        }
        prop_assert_eq!(removed, report.eliminated);
    }

    /// Only moves are erased; destroys and everything else keep their order.
    #[test]
    fn prop_only_moves_disappear(recipe in recipe_strategy()) {
        let mut func = build(&recipe);
        let moves_before = func.count_insts(InstKind::is_move);
        let destroys_before = func.count_insts(|kind| matches!(kind, InstKind::Destroy { .. }));
        let others_before = non_moves(&func);

        let report = eliminate_redundant_moves_with_decisions(&mut func);

        prop_assert_eq!(report.decisions.len(), moves_before);
        prop_assert_eq!(func.count_insts(InstKind::is_move), moves_before - report.eliminated);
        prop_assert_eq!(
            func.count_insts(|kind| matches!(kind, InstKind::Destroy { .. })),
            destroys_before
        );
        prop_assert_eq!(non_moves(&func), others_before);
    }
}
