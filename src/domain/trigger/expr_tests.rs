#[cfg(test)]
mod tests {
    use crate::domain::suite::{Defs, NodeId};
    use crate::domain::trigger::{BoolExpr, Comparison, NodeState, all_complete};

    /// /s/f: a, b, c, target   and   /s/admin/toggles
    fn setup() -> (Defs, [NodeId; 5]) {
        let mut defs = Defs::new();
        let suite = defs.add_suite("s").unwrap();
        let family = defs.add_family(suite, "f").unwrap();
        let a = defs.add_task(family, "a").unwrap();
        let b = defs.add_task(family, "b").unwrap();
        let c = defs.add_task(family, "c").unwrap();
        let target = defs.add_task(family, "target").unwrap();
        let admin = defs.add_family(suite, "admin").unwrap();
        let toggles = defs.add_task(admin, "toggles").unwrap();
        defs.add_event(toggles, "no_archive");
        (defs, [a, b, c, target, toggles])
    }

    #[test]
    fn test_empty_is_identity_of_and_and_or() {
        let (_, [a, ..]) = setup();
        let x = BoolExpr::complete(a);

        assert_eq!(BoolExpr::Empty & x.clone(), x);
        assert_eq!(x.clone() & BoolExpr::Empty, x);
        assert_eq!(BoolExpr::Empty | x.clone(), x);
        assert_eq!(x.clone() | BoolExpr::Empty, x);
        assert_eq!(!BoolExpr::Empty, BoolExpr::Empty);
    }

    #[test]
    fn test_assign_operators_start_from_empty() {
        let (defs, [a, b, _, target, _]) = setup();
        let mut expr = BoolExpr::default();
        expr &= BoolExpr::complete(a);
        expr |= BoolExpr::aborted(b);

        assert_eq!(expr.render(&defs, target), "a == complete or b == aborted");
    }

    #[test]
    fn test_or_inside_and_is_parenthesized() {
        let (defs, [a, b, c, target, _]) = setup();
        let expr = (BoolExpr::complete(a) | BoolExpr::complete(b)) & BoolExpr::complete(c);

        assert_eq!(expr.render(&defs, target), "(a == complete or b == complete) and c == complete");
    }

    #[test]
    fn test_and_inside_or_needs_no_parentheses() {
        let (defs, [a, b, c, target, _]) = setup();
        let expr = BoolExpr::complete(a) | (BoolExpr::complete(b) & BoolExpr::complete(c));

        assert_eq!(expr.render(&defs, target), "a == complete or b == complete and c == complete");
    }

    #[test]
    fn test_not_wraps_lower_ranked_operand() {
        let (defs, [a, b, _, target, _]) = setup();

        let negated_or = !(BoolExpr::complete(a) | BoolExpr::complete(b));
        assert_eq!(negated_or.render(&defs, target), "not (a == complete or b == complete)");

        let negated_state = !BoolExpr::state(a, NodeState::Active);
        assert_eq!(negated_state.render(&defs, target), "not a == active");
    }

    #[test]
    fn test_event_on_other_family_renders_absolute() {
        let (defs, [_, _, _, target, toggles]) = setup();
        let expr = BoolExpr::event(toggles, "no_archive");

        assert_eq!(expr.render(&defs, target), "/s/admin/toggles:no_archive");
    }

    #[test]
    fn test_literals() {
        let (defs, [.., target, _]) = setup();
        assert_eq!(BoolExpr::always().render(&defs, target), "1==1");
        assert_eq!(BoolExpr::never().render(&defs, target), "1==0");
        assert_eq!(BoolExpr::literal("").render(&defs, target), "");
    }

    #[test]
    fn test_literal_comparison_is_decided_immediately() {
        assert_eq!(BoolExpr::literal("52").equals(BoolExpr::literal("52")), Comparison::Static(true));
        assert_eq!(BoolExpr::literal("52").equals(BoolExpr::literal("51")), Comparison::Static(false));
        assert_eq!(BoolExpr::literal("52").not_equals(BoolExpr::literal("51")), Comparison::Static(true));
    }

    #[test]
    fn test_comparison_with_node_reference_is_deferred() {
        let (defs, [_, _, _, target, toggles]) = setup();
        let comparison = BoolExpr::event(toggles, "no_archive").not_equals(BoolExpr::literal("1"));

        match comparison {
            Comparison::Deferred(expr) => assert_eq!(expr.render(&defs, target), "/s/admin/toggles:no_archive != 1"),
            other => panic!("Expected a deferred comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_reference_drops_out_of_rendering() {
        let (mut defs, [a, _, _, target, _]) = setup();
        let elsewhere = defs.add_suite("elsewhere").unwrap();
        let stranger = defs.add_task(elsewhere, "stranger").unwrap();

        assert_eq!(BoolExpr::complete(stranger).render(&defs, target), "");
        let mixed = BoolExpr::complete(stranger) & BoolExpr::complete(a);
        assert_eq!(mixed.render(&defs, target), "a == complete");
    }

    #[test]
    fn test_all_complete() {
        let (defs, [a, b, c, target, _]) = setup();

        assert_eq!(all_complete(Vec::new()), BoolExpr::Empty);
        assert_eq!(all_complete([a, b, c]).render(&defs, target), "a == complete and b == complete and c == complete");
    }

    #[test]
    fn test_nodes_are_collected_once_in_order() {
        let (_, [a, b, _, _, toggles]) = setup();
        let expr = BoolExpr::complete(b) & (BoolExpr::complete(a) | BoolExpr::aborted(b)) & BoolExpr::event(toggles, "no_archive");

        assert_eq!(expr.nodes(), vec![b, a, toggles]);
        assert_eq!(expr.events(), vec![(toggles, "no_archive")]);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let (defs, [a, b, c, target, _]) = setup();
        let expr = !(BoolExpr::complete(a) & BoolExpr::complete(b)) | BoolExpr::complete(c);

        let first = expr.render(&defs, target);
        let second = expr.clone().render(&defs, target);
        assert_eq!(first, second);
        assert_eq!(first, "not (a == complete and b == complete) or c == complete");
    }
}
