// ==========================================
// 订单齐套 API 集成测试
// ==========================================
// 职责: 库存 + 订单 + 产线落库后，验证齐套计算结果
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod fulfillment_api_test {
    use inventory_ledger::api::ApiError;
    use inventory_ledger::config::config_keys;
    use inventory_ledger::domain::order::SubLine;
    use inventory_ledger::domain::types::{Grade, LineStatus, OrderStatus, TradeType};
    use inventory_ledger::engine::FulfillmentResult;

    use crate::test_helpers::{
        allocated_order, bonded_key, create_test_state, general_key, movement, order, running_line,
    };

    #[test]
    fn test_single_order_full_stock() {
        let (_tmp, state) = create_test_state();
        state
            .inventory_api
            .stock_in(&movement(&general_key("ST-1"), 150.0, Grade::A))
            .unwrap();

        let target = order("SO-1", "ST-1", 100.0, OrderStatus::Confirmed);
        let result = state
            .fulfillment_api
            .compute_fulfillment(&target, &[target.clone()], false)
            .unwrap();
        assert_eq!(
            result,
            FulfillmentResult { available: 150.0, percent: 100.0, is_shortage: false }
        );
    }

    #[test]
    fn test_competing_order_creates_shortage() {
        let (_tmp, state) = create_test_state();
        state
            .inventory_api
            .stock_in(&movement(&general_key("ST-1"), 150.0, Grade::A))
            .unwrap();

        let target = order("SO-1", "ST-1", 100.0, OrderStatus::Confirmed);
        let other = order("SO-2", "ST-1", 80.0, OrderStatus::Pending);
        state.order_repo.upsert(&target).unwrap();
        state.order_repo.upsert(&other).unwrap();

        let result = state.fulfillment_api.compute_for_order("SO-1", Some(false)).unwrap();
        assert_eq!(
            result,
            FulfillmentResult { available: 70.0, percent: 70.0, is_shortage: true }
        );

        // 快照未变，重复计算结果一致
        let again = state.fulfillment_api.compute_for_order("SO-1", Some(false)).unwrap();
        assert_eq!(result, again);
    }

    #[test]
    fn test_ready_to_ship_order() {
        let (_tmp, state) = create_test_state();
        let target = order("SO-9", "ST-1", 25.0, OrderStatus::ReadyToShip);
        state.order_repo.upsert(&target).unwrap();

        let result = state.fulfillment_api.compute_for_order("SO-9", None).unwrap();
        assert_eq!(
            result,
            FulfillmentResult { available: 25.0, percent: 100.0, is_shortage: false }
        );
    }

    #[test]
    fn test_locked_stock_not_available() {
        let (_tmp, state) = create_test_state();
        let key = general_key("ST-1");
        state.inventory_api.stock_in(&movement(&key, 50.0, Grade::A)).unwrap();
        state.inventory_api.lock(&key, 20.0, None, None).unwrap();

        let target = order("SO-1", "ST-1", 40.0, OrderStatus::Pending);
        let result = state
            .fulfillment_api
            .compute_fulfillment(&target, &[], false)
            .unwrap();
        assert_eq!(result.available, 30.0);
        assert_eq!(result.percent, 75.0);
    }

    #[test]
    fn test_allocation_with_production_lines() {
        let (_tmp, state) = create_test_state();
        state
            .inventory_api
            .stock_in(&movement(&general_key("ST-1"), 10.0, Grade::A))
            .unwrap();
        state
            .inventory_api
            .stock_in(&movement(&bonded_key("ST-1"), 40.0, Grade::B))
            .unwrap();

        state.production_line_repo.upsert(&running_line("L1", "ST-1", 6.0)).unwrap();
        let mut split_line = running_line("L2", "ST-X", 99.0);
        split_line.sub_lines = vec![
            SubLine { name: "2A".to_string(), current_style: Some("ST-1".to_string()), export_capacity: 4.0 },
            SubLine { name: "2B".to_string(), current_style: Some("ST-2".to_string()), export_capacity: 8.0 },
        ];
        state.production_line_repo.upsert(&split_line).unwrap();
        let mut stopped = running_line("L3", "ST-1", 50.0);
        stopped.status = LineStatus::Stopped;
        state.production_line_repo.upsert(&stopped).unwrap();

        let target = allocated_order("SO-1", "ST-1", 30.0, 20.0);
        state.order_repo.upsert(&target).unwrap();

        // 一般仓 min(30, 10) + 保税仓 min(20, 40) = 30；在产 6 + 4 = 10
        let without = state.fulfillment_api.compute_for_order("SO-1", Some(false)).unwrap();
        assert_eq!(without.available, 30.0);
        assert_eq!(without.percent, 60.0);

        let with = state.fulfillment_api.compute_for_order("SO-1", Some(true)).unwrap();
        assert_eq!(with.available, 40.0);
        assert_eq!(with.percent, 80.0);
        assert_eq!(state.fulfillment_api.production_for_style("ST-1").unwrap(), 10.0);
    }

    #[test]
    fn test_include_production_defaults_from_config() {
        let (_tmp, state) = create_test_state();
        state.production_line_repo.upsert(&running_line("L1", "ST-1", 5.0)).unwrap();
        state
            .order_repo
            .upsert(&order("SO-1", "ST-1", 10.0, OrderStatus::InProduction))
            .unwrap();

        let by_default = state.fulfillment_api.compute_for_order("SO-1", None).unwrap();
        assert_eq!(by_default.available, 5.0);

        state
            .config
            .set_global_config_value(config_keys::FULFILLMENT_INCLUDE_PRODUCTION, "false")
            .unwrap();
        let disabled = state.fulfillment_api.compute_for_order("SO-1", None).unwrap();
        assert_eq!(disabled.available, 0.0);
        assert_eq!(disabled.percent, 0.0);
    }

    #[test]
    fn test_compute_all_open_skips_shipped() {
        let (_tmp, state) = create_test_state();
        state
            .inventory_api
            .stock_in(&movement(&general_key("ST-1"), 60.0, Grade::A))
            .unwrap();
        state
            .inventory_api
            .stock_in(&movement(&bonded_key("ST-2"), 5.0, Grade::A))
            .unwrap();

        let mut bonded = order("SO-3", "ST-2", 10.0, OrderStatus::Pending);
        bonded.trade_type = TradeType::Bonded;
        for o in [
            order("SO-1", "ST-1", 50.0, OrderStatus::Confirmed),
            order("SO-2", "ST-1", 20.0, OrderStatus::Shipped),
            bonded,
        ] {
            state.order_repo.upsert(&o).unwrap();
        }

        let results = state.fulfillment_api.compute_all_open(Some(false)).unwrap();
        assert_eq!(results.len(), 2);

        let so1 = results.iter().find(|r| r.order_id == "SO-1").unwrap();
        assert_eq!(so1.result.available, 60.0);
        assert!(!so1.result.is_shortage);

        let so3 = results.iter().find(|r| r.order_id == "SO-3").unwrap();
        assert_eq!(so3.result.available, 5.0);
        assert_eq!(so3.result.percent, 50.0);
    }

    #[test]
    fn test_unknown_order_and_bad_input() {
        let (_tmp, state) = create_test_state();
        assert!(matches!(
            state.fulfillment_api.compute_for_order("NOPE", None),
            Err(ApiError::NotFound(_))
        ));

        let bad = order("SO-1", "", 10.0, OrderStatus::Pending);
        assert!(matches!(
            state.fulfillment_api.compute_fulfillment(&bad, &[], false),
            Err(ApiError::ValidationError(_))
        ));
    }
}
