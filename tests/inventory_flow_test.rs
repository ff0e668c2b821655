// ==========================================
// 库存出入库流程集成测试
// ==========================================
// 职责: 通过 AppState 验证出入库/调整/锁定与流水、审计的联动
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod inventory_flow_test {
    use inventory_ledger::api::ApiError;
    use inventory_ledger::domain::inventory::{round_qty, InventoryKey};
    use inventory_ledger::domain::ledger::{AuditLogFilter, TransactionFilter};
    use inventory_ledger::domain::types::{AuditAction, Grade, TransactionType, WarehouseType};

    use crate::test_helpers::{create_test_state, general_key, movement};

    #[test]
    fn test_stock_in_then_out_restores_balance() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");

        api.stock_in(&movement(&key, 18.5, Grade::A)).unwrap();
        let out = api.stock_out(&movement(&key, 18.5, Grade::A)).unwrap();
        assert_eq!(out.record.current_stock, 0.0);

        let page = state
            .ledger_api
            .list_transactions(&TransactionFilter::default())
            .unwrap();
        assert_eq!(page.total, 2);
        // 新→旧
        assert_eq!(page.items[0].tx_type, TransactionType::Out);
        assert_eq!(page.items[0].balance, 0.0);
        assert_eq!(page.items[1].tx_type, TransactionType::In);
        assert_eq!(page.items[1].balance, 18.5);
    }

    #[test]
    fn test_lock_then_ship_releases_lock() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");

        api.stock_in(&movement(&key, 80.0, Grade::A)).unwrap();
        api.lock(&key, 30.0, Some("今日装柜".to_string()), None).unwrap();
        let out = api.stock_out(&movement(&key, 40.0, Grade::A)).unwrap();

        assert_eq!(out.record.grade_a, 40.0);
        assert_eq!(out.record.locked_for_today, 0.0);
        assert_eq!(out.record.current_stock, 40.0);

        let logs = state
            .ledger_api
            .list_audit_logs(&AuditLogFilter::default())
            .unwrap();
        assert_eq!(logs.total, 1);
        assert_eq!(logs.items[0].action, AuditAction::Lock);
        assert_eq!(logs.items[0].operator, "system");
        assert_eq!(logs.items[0].after_locked, 30.0);
    }

    #[test]
    fn test_exact_bucket_out_then_one_more_fails() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");

        api.stock_in(&movement(&key, 12.34, Grade::B)).unwrap();
        let out = api.stock_out(&movement(&key, 12.34, Grade::B)).unwrap();
        assert_eq!(out.record.grade_b, 0.0);

        let err = api.stock_out(&movement(&key, 0.01, Grade::B)).unwrap_err();
        match err {
            ApiError::InsufficientStock { style_no, grade, requested, available } => {
                assert_eq!(style_no, "ST-100");
                assert_eq!(grade, "B");
                assert_eq!(requested, 0.01);
                assert_eq!(available, 0.0);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_adjust_writes_audit_and_ledger() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");

        api.stock_in(&movement(&key, 80.0, Grade::A)).unwrap();
        let result = api
            .adjust(&key, Some(50.0), None, Some("盘亏".to_string()), Some("张三".to_string()))
            .unwrap();
        assert_eq!(result.record.grade_a, 50.0);
        assert_eq!(result.record.current_stock, 50.0);

        let logs = state
            .ledger_api
            .list_audit_logs(&AuditLogFilter {
                action: Some(AuditAction::Adjust),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(logs.items.len(), 1);
        assert_eq!(logs.items[0].before_grade_a, 80.0);
        assert_eq!(logs.items[0].after_grade_a, 50.0);
        assert_eq!(logs.items[0].operator, "张三");

        let adjust_rows = state
            .ledger_api
            .list_transactions(&TransactionFilter {
                tx_type: Some(TransactionType::AdjustOut),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(adjust_rows.total, 1);
        assert_eq!(adjust_rows.items[0].grade, Grade::A);
        assert_eq!(adjust_rows.items[0].quantity, 30.0);
        assert_eq!(adjust_rows.items[0].note.as_deref(), Some("盘亏"));
    }

    #[test]
    fn test_not_found_and_validation_errors() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let missing = general_key("NOPE");

        assert!(matches!(
            api.adjust(&missing, Some(1.0), None, None, None),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(api.lock(&missing, 1.0, None, None), Err(ApiError::NotFound(_))));
        assert!(matches!(api.get_record(&missing), Err(ApiError::NotFound(_))));

        assert!(matches!(
            api.stock_in(&movement(&general_key("ST-1"), 0.0, Grade::A)),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.lock(&InventoryKey::new(" ", WarehouseType::General, "", None), 1.0, None, None),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_storage_failure_rolls_back_whole_operation() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");
        api.stock_in(&movement(&key, 40.0, Grade::A)).unwrap();
        api.stock_in(&movement(&key, 10.0, Grade::B)).unwrap();

        {
            let conn = state.conn.lock().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER fail_audit_insert BEFORE INSERT ON inventory_audit_log
                 BEGIN SELECT RAISE(ABORT, 'audit write failed'); END;",
            )
            .unwrap();
        }

        // 两个品级的调整流水都已暂存，审计写入失败后一并撤销
        let err = api
            .adjust(&key, Some(30.0), Some(15.0), Some("盘点".to_string()), None)
            .unwrap_err();
        assert!(matches!(err, ApiError::StorageFailure(_)), "{err:?}");

        let record = api.get_record(&key).unwrap();
        assert_eq!(record.grade_a, 40.0);
        assert_eq!(record.grade_b, 10.0);
        assert_eq!(record.current_stock, 50.0);

        let ledger = state
            .ledger_api
            .list_transactions(&TransactionFilter::default())
            .unwrap();
        assert_eq!(ledger.total, 2);
        assert!(ledger.items.iter().all(|e| e.tx_type == TransactionType::In));
        assert_eq!(
            state.ledger_api.list_audit_logs(&AuditLogFilter::default()).unwrap().total,
            0
        );
        assert!(state.ledger_api.reconcile().unwrap().is_consistent());
    }

    #[test]
    fn test_lock_over_available_rejected() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");
        api.stock_in(&movement(&key, 10.0, Grade::A)).unwrap();

        let err = api.lock(&key, 10.5, None, None).unwrap_err();
        assert!(matches!(
            err,
            ApiError::InsufficientAvailable { requested, available, .. }
                if requested == 10.5 && available == 10.0
        ));
    }

    #[test]
    fn test_batch_out_reports_failures_and_commits_rest() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let a = general_key("ST-A");
        let b = general_key("ST-B");

        let batch_in = api
            .batch_in(&[movement(&a, 10.0, Grade::A), movement(&b, 3.0, Grade::B)])
            .unwrap();
        assert_eq!(batch_in.processed, 2);

        let result = api
            .batch_out(&[movement(&a, 2.5, Grade::A), movement(&b, 3.5, Grade::B)])
            .unwrap();
        assert_eq!(result.processed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].style_no.as_deref(), Some("ST-B"));

        assert_eq!(api.get_record(&a).unwrap().grade_a, 7.5);
        assert_eq!(api.get_record(&b).unwrap().grade_b, 3.0);

        assert!(matches!(api.batch_out(&[]), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_invariants_after_mixed_operations() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");
        let lined = InventoryKey::new("ST-100", WarehouseType::Bonded, "1T", Some("L2".to_string()));

        api.stock_in(&movement(&key, 33.333, Grade::A)).unwrap();
        api.stock_in(&movement(&key, 11.111, Grade::B)).unwrap();
        api.stock_in(&movement(&lined, 5.0, Grade::A)).unwrap();
        api.lock(&key, 40.0, None, None).unwrap();
        api.adjust(&key, None, Some(0.0), None, None).unwrap();
        api.unlock(&key, 1.0, None, None).unwrap();
        api.stock_out(&movement(&key, 3.33, Grade::A)).unwrap();

        for rec in api.list_inventory(None).unwrap() {
            assert_eq!(rec.current_stock, round_qty(rec.grade_a + rec.grade_b));
            assert!(rec.locked_for_today <= rec.current_stock);
        }
        assert_eq!(api.list_inventory(Some("L2")).unwrap().len(), 1);

        let report = state.ledger_api.reconcile().unwrap();
        assert!(report.is_consistent(), "{report:?}");
        assert_eq!(report.keys_checked, 2);
    }

    #[test]
    fn test_safety_alerts_and_summary() {
        let (_tmp, state) = create_test_state();
        let api = &state.inventory_api;
        let key = general_key("ST-100");

        api.stock_in(&movement(&key, 20.0, Grade::A)).unwrap();
        api.lock(&key, 15.0, None, None).unwrap();
        api.set_safety_stock(&key, 10.0).unwrap();

        let alerts = api.alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].available, 5.0);
        assert_eq!(alerts[0].shortage, 5.0);

        // 设置安全库存不写流水/审计
        assert_eq!(state.ledger_api.list_transactions(&TransactionFilter::default()).unwrap().total, 1);
        assert_eq!(state.ledger_api.list_audit_logs(&AuditLogFilter::default()).unwrap().total, 1);

        let summary = api.summary_by_style().unwrap();
        assert_eq!(summary[0].style_no, "ST-100");
        assert_eq!(summary[0].available, 5.0);
    }

    #[test]
    fn test_reset_all_data() {
        let (_tmp, state) = create_test_state();
        let key = general_key("ST-100");
        state.inventory_api.stock_in(&movement(&key, 1.0, Grade::A)).unwrap();

        let summary = state.admin_api.reset_all_data("admin").unwrap();
        assert_eq!(summary.inventory_rows, 1);
        assert_eq!(summary.transaction_rows, 1);
        assert!(state.inventory_api.list_inventory(None).unwrap().is_empty());
        assert_eq!(
            state.ledger_api.list_transactions(&TransactionFilter::default()).unwrap().total,
            0
        );
    }
}
