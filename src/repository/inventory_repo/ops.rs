// ==========================================
// 库存仓储 - 写操作
// ==========================================
// 入库/出库/批量/调整/锁定/解锁/安全库存/重置
// 每个公开方法 = 一个事务，失败整体回滚
// ==========================================

use super::{
    AdjustRequest, AdjustResult, BatchItemError, BatchResult, InventoryStore, LockRequest,
    StockResult,
};
use crate::domain::inventory::{round_qty, InventoryKey, InventoryRecord, StockMovement, ValidMovement};
use crate::domain::ledger::{NewAuditLog, NewTransaction};
use crate::domain::types::{AuditAction, Grade, TransactionType};
use crate::repository::audit_log_repo::AuditLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::now_ts;
use crate::repository::transaction_repo::TransactionRepository;
use rusqlite::{Connection, Transaction};
use tracing::{info, warn};

/// 提交事务；提交失败整体回滚，作为存储失败上抛
fn commit(tx: Transaction<'_>) -> RepositoryResult<()> {
    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
}

fn validate_quantity(field: &str, qty: f64) -> RepositoryResult<f64> {
    let q = round_qty(qty);
    if !qty.is_finite() || q <= 0.0 {
        return Err(RepositoryError::ValidationError(format!("{}必须大于0: {}", field, qty)));
    }
    Ok(q)
}

impl InventoryStore {
    // ==========================================
    // 事务内单步操作
    // ==========================================

    /// 入库: 不存在则建零库存行，再累加到指定品级
    fn apply_stock_in(conn: &Connection, mv: &ValidMovement) -> RepositoryResult<StockResult> {
        let now = now_ts();
        let (row_id, mut record) = match Self::load(conn, &mv.key)? {
            Some((id, rec)) => (Some(id), rec),
            None => (None, InventoryRecord::empty(mv.key.clone(), now)),
        };

        let before = record.grade_qty(mv.grade);
        record.set_grade_qty(mv.grade, before + mv.quantity);
        record.recompute();
        record.last_updated = now;
        Self::save(conn, row_id, &record)?;

        let seq = TransactionRepository::append(
            conn,
            &NewTransaction {
                key: mv.key.clone(),
                tx_type: TransactionType::In,
                grade: mv.grade,
                quantity: mv.quantity,
                balance: record.current_stock,
                source: mv.source.clone(),
                note: mv.note.clone(),
                order_id: mv.order_id.clone(),
            },
        )?;

        Ok(StockResult {
            record,
            transaction_seq: seq,
        })
    }

    /// 出库: 品级不足则拒绝；先消耗本次出库对应的当日锁定量
    fn apply_stock_out(conn: &Connection, mv: &ValidMovement) -> RepositoryResult<StockResult> {
        let loaded = Self::load(conn, &mv.key)?;
        let available = loaded
            .as_ref()
            .map(|(_, rec)| rec.grade_qty(mv.grade))
            .unwrap_or(0.0);

        let (row_id, mut record) = match loaded {
            Some(found) if available >= mv.quantity => found,
            _ => {
                return Err(RepositoryError::InsufficientStock {
                    style_no: mv.key.style_no.clone(),
                    key: mv.key.to_string(),
                    grade: mv.grade.to_string(),
                    requested: mv.quantity,
                    available,
                })
            }
        };

        let released = record.locked_for_today.min(mv.quantity);
        record.set_grade_qty(mv.grade, available - mv.quantity);
        record.locked_for_today = round_qty(record.locked_for_today - released);
        record.recompute();
        record.last_updated = now_ts();
        Self::save(conn, Some(row_id), &record)?;

        let seq = TransactionRepository::append(
            conn,
            &NewTransaction {
                key: mv.key.clone(),
                tx_type: TransactionType::Out,
                grade: mv.grade,
                quantity: mv.quantity,
                balance: record.current_stock,
                source: mv.source.clone(),
                note: mv.note.clone(),
                order_id: mv.order_id.clone(),
            },
        )?;

        Ok(StockResult {
            record,
            transaction_seq: seq,
        })
    }

    // ==========================================
    // 入库 / 出库
    // ==========================================

    /// 单笔入库
    ///
    /// # 返回
    /// - Ok(StockResult): 入库后的库存行 + 流水顺序号
    /// - Err(ValidationError): 款号缺失或数量非正
    pub fn stock_in(&self, movement: &StockMovement) -> RepositoryResult<StockResult> {
        let mv = movement.validate().map_err(RepositoryError::ValidationError)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let result = Self::apply_stock_in(&tx, &mv)?;
        commit(tx)?;

        info!(
            key = %mv.key,
            grade = %mv.grade,
            quantity = mv.quantity,
            balance = result.record.current_stock,
            "stock in"
        );
        Ok(result)
    }

    /// 单笔出库
    ///
    /// # 返回
    /// - Err(InsufficientStock): 指定品级库存不足（库存行不存在视为 0）
    pub fn stock_out(&self, movement: &StockMovement) -> RepositoryResult<StockResult> {
        let mv = movement.validate().map_err(RepositoryError::ValidationError)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let result = match Self::apply_stock_out(&tx, &mv) {
            Ok(r) => r,
            Err(e) => {
                warn!(key = %mv.key, grade = %mv.grade, quantity = mv.quantity, error = %e, "stock out rejected");
                return Err(e);
            }
        };
        commit(tx)?;

        info!(
            key = %mv.key,
            grade = %mv.grade,
            quantity = mv.quantity,
            balance = result.record.current_stock,
            locked = result.record.locked_for_today,
            "stock out"
        );
        Ok(result)
    }

    /// 批量入库（同一事务）
    ///
    /// 缺款号/缺数量的条目直接跳过，不影响其余条目。
    pub fn batch_in(&self, items: &[StockMovement]) -> RepositoryResult<BatchResult> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut result = BatchResult::default();
        for movement in items {
            let mv = match movement.validate() {
                Ok(mv) => mv,
                Err(_) => {
                    result.skipped += 1;
                    continue;
                }
            };
            let applied = Self::apply_stock_in(&tx, &mv)?;
            result.processed += 1;
            result.records.push(applied.record);
        }

        commit(tx)?;
        info!(processed = result.processed, skipped = result.skipped, "batch stock in");
        Ok(result)
    }

    /// 批量出库（同一事务）
    ///
    /// 库存不足的条目记入 errors 并继续；存储错误则整批回滚。
    pub fn batch_out(&self, items: &[StockMovement]) -> RepositoryResult<BatchResult> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut result = BatchResult::default();
        for (index, movement) in items.iter().enumerate() {
            let mv = match movement.validate() {
                Ok(mv) => mv,
                Err(_) => {
                    result.skipped += 1;
                    continue;
                }
            };
            match Self::apply_stock_out(&tx, &mv) {
                Ok(applied) => {
                    result.processed += 1;
                    result.records.push(applied.record);
                }
                Err(RepositoryError::InsufficientStock { requested, available, .. }) => {
                    result.errors.push(BatchItemError {
                        index,
                        style_no: Some(mv.key.style_no.clone()),
                        message: format!(
                            "{} 品级{} 库存不足: 需要{}t, 现有{}t",
                            mv.key, mv.grade, requested, available
                        ),
                        requested: Some(requested),
                        available: Some(available),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        commit(tx)?;
        if !result.errors.is_empty() {
            warn!(failed = result.errors.len(), "batch stock out partially rejected");
        }
        info!(processed = result.processed, skipped = result.skipped, "batch stock out");
        Ok(result)
    }

    // ==========================================
    // 调整 / 锁定 / 解锁 / 安全库存
    // ==========================================

    /// 库存调整（盘点）
    ///
    /// 写一条 ADJUST 审计；每个发生变化的品级各写一条 ADJUST_IN/ADJUST_OUT 流水。
    /// 两条流水时，第一条的 balance 为中间结存，保证流水可回放。
    pub fn adjust(&self, req: &AdjustRequest) -> RepositoryResult<AdjustResult> {
        if req.grade_a.is_none() && req.grade_b.is_none() {
            return Err(RepositoryError::ValidationError("至少指定一个品级的调整值".to_string()));
        }
        for (field, value) in [("grade_a", req.grade_a), ("grade_b", req.grade_b)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(RepositoryError::FieldValueError {
                        field: field.to_string(),
                        message: format!("调整值必须为非负数: {}", v),
                    });
                }
            }
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let (row_id, mut record) = Self::load(&tx, &req.key)?.ok_or_else(|| Self::not_found(&req.key))?;
        let before = record.clone();

        let mut transaction_seqs = Vec::new();
        for (grade, target) in [(Grade::A, req.grade_a), (Grade::B, req.grade_b)] {
            let Some(target) = target else { continue };
            let old = record.grade_qty(grade);
            let new = round_qty(target);
            let delta = round_qty(new - old);
            if delta == 0.0 {
                continue;
            }

            // 中间结存只重算 current_stock；锁定量在全部品级落定后统一压回
            record.set_grade_qty(grade, new);
            record.current_stock = round_qty(record.grade_a + record.grade_b);

            let seq = TransactionRepository::append(
                &tx,
                &NewTransaction {
                    key: req.key.clone(),
                    tx_type: if delta > 0.0 {
                        TransactionType::AdjustIn
                    } else {
                        TransactionType::AdjustOut
                    },
                    grade,
                    quantity: delta.abs(),
                    balance: record.current_stock,
                    source: Some("adjust".to_string()),
                    note: req.reason.clone(),
                    order_id: None,
                },
            )?;
            transaction_seqs.push(seq);
        }

        record.recompute();
        record.last_updated = now_ts();
        Self::save(&tx, Some(row_id), &record)?;

        let audit_seq = AuditLogRepository::append(
            &tx,
            &NewAuditLog {
                key: req.key.clone(),
                action: AuditAction::Adjust,
                before_grade_a: before.grade_a,
                before_grade_b: before.grade_b,
                after_grade_a: record.grade_a,
                after_grade_b: record.grade_b,
                before_locked: before.locked_for_today,
                after_locked: record.locked_for_today,
                reason: req.reason.clone(),
                operator: req.operator.clone(),
            },
        )?;

        commit(tx)?;
        info!(
            key = %req.key,
            before_a = before.grade_a,
            before_b = before.grade_b,
            after_a = record.grade_a,
            after_b = record.grade_b,
            ledger_rows = transaction_seqs.len(),
            operator = %req.operator,
            "inventory adjusted"
        );

        Ok(AdjustResult {
            record,
            audit_seq,
            transaction_seqs,
        })
    }

    /// 锁定当日发货量（预留，不产生流水）
    ///
    /// # 返回
    /// - Err(InsufficientAvailable): 锁定量 > current_stock - locked_for_today
    pub fn lock(&self, req: &LockRequest) -> RepositoryResult<InventoryRecord> {
        let quantity = validate_quantity("锁定量", req.quantity)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let (row_id, mut record) = Self::load(&tx, &req.key)?.ok_or_else(|| Self::not_found(&req.key))?;
        let available = record.available();
        if quantity > available {
            warn!(key = %req.key, requested = quantity, available, "lock rejected");
            return Err(RepositoryError::InsufficientAvailable {
                style_no: req.key.style_no.clone(),
                key: req.key.to_string(),
                requested: quantity,
                available,
            });
        }

        let before_locked = record.locked_for_today;
        record.locked_for_today = round_qty(before_locked + quantity);
        record.recompute();
        record.last_updated = now_ts();
        Self::save(&tx, Some(row_id), &record)?;

        Self::append_lock_audit(&tx, req, AuditAction::Lock, &record, before_locked)?;
        commit(tx)?;

        info!(key = %req.key, quantity, locked = record.locked_for_today, "inventory locked");
        Ok(record)
    }

    /// 解锁（不低于 0）
    pub fn unlock(&self, req: &LockRequest) -> RepositoryResult<InventoryRecord> {
        let quantity = validate_quantity("解锁量", req.quantity)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let (row_id, mut record) = Self::load(&tx, &req.key)?.ok_or_else(|| Self::not_found(&req.key))?;
        let before_locked = record.locked_for_today;
        record.locked_for_today = round_qty((before_locked - quantity).max(0.0));
        record.recompute();
        record.last_updated = now_ts();
        Self::save(&tx, Some(row_id), &record)?;

        Self::append_lock_audit(&tx, req, AuditAction::Unlock, &record, before_locked)?;
        commit(tx)?;

        info!(key = %req.key, quantity, locked = record.locked_for_today, "inventory unlocked");
        Ok(record)
    }

    fn append_lock_audit(
        conn: &Connection,
        req: &LockRequest,
        action: AuditAction,
        record: &InventoryRecord,
        before_locked: f64,
    ) -> RepositoryResult<i64> {
        AuditLogRepository::append(
            conn,
            &NewAuditLog {
                key: req.key.clone(),
                action,
                before_grade_a: record.grade_a,
                before_grade_b: record.grade_b,
                after_grade_a: record.grade_a,
                after_grade_b: record.grade_b,
                before_locked,
                after_locked: record.locked_for_today,
                reason: req.reason.clone(),
                operator: req.operator.clone(),
            },
        )
    }

    /// 设置安全库存（仅元数据，不写流水/审计）
    pub fn set_safety_stock(&self, key: &InventoryKey, safety_stock: f64) -> RepositoryResult<InventoryRecord> {
        if !safety_stock.is_finite() || safety_stock < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "safety_stock".to_string(),
                message: format!("安全库存必须为非负数: {}", safety_stock),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let (row_id, mut record) = Self::load(&tx, key)?.ok_or_else(|| Self::not_found(key))?;
        record.safety_stock = round_qty(safety_stock);
        record.last_updated = now_ts();
        Self::save(&tx, Some(row_id), &record)?;
        commit(tx)?;

        info!(key = %key, safety_stock = record.safety_stock, "safety stock updated");
        Ok(record)
    }

    // ==========================================
    // 全量重置
    // ==========================================

    /// 清空库存、流水、审计（唯一允许删除流水/审计的路径）
    ///
    /// # 返回
    /// - Ok((库存行, 流水行, 审计行)): 各表删除行数
    pub fn reset_all(&self) -> RepositoryResult<(usize, usize, usize)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let inventory = tx.execute("DELETE FROM inventory", [])?;
        let transactions = tx.execute("DELETE FROM inventory_transaction", [])?;
        let audits = tx.execute("DELETE FROM inventory_audit_log", [])?;
        commit(tx)?;

        warn!(inventory, transactions, audits, "inventory data reset");
        Ok((inventory, transactions, audits))
    }
}
