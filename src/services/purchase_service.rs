use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;

use crate::{
    dto::purchases::History,
    entity::{
        Items,
        items::Column as ItemCol,
        purchases::{ActiveModel as PurchaseActive, Model as PurchaseModel},
    },
    error::{AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{HistoryEntry, HistoryKind, Purchase},
    state::AppState,
};

/// Buy one unit of an item.
///
/// The conditional decrement is the first statement of the transaction, so
/// the write lock is taken before anything is read: racing buyers queue on
/// the lock instead of failing, and only as many succeed as there were units.
/// The purchase row is written in the same transaction with the item's title,
/// price and seller as they are at this moment.
pub async fn buy(state: &AppState, buyer: &CurrentUser, item_id: i64) -> AppResult<Purchase> {
    let txn = state.orm.begin().await?;

    let result = Items::update_many()
        .col_expr(ItemCol::Quantity, Expr::col(ItemCol::Quantity).sub(1))
        .filter(ItemCol::Id.eq(item_id))
        .filter(ItemCol::Quantity.gt(0))
        .exec(&txn)
        .await?;

    let item = Items::find_by_id(item_id).one(&txn).await?;
    let item = match (item, result.rows_affected) {
        (None, _) => return Err(AppError::NotFound("Item not found.".into())),
        (Some(_), 0) => return Err(AppError::Unavailable("Item is out of stock.".into())),
        (Some(item), _) => item,
    };

    let purchase = PurchaseActive {
        id: NotSet,
        buyer_id: Set(buyer.id),
        item_id: Set(item.id),
        seller_id: Set(item.seller_id),
        title: Set(item.title),
        price: Set(item.price),
        purchase_date: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        purchase_id = purchase.id,
        item_id,
        buyer_id = buyer.id,
        remaining = item.quantity,
        "item purchased"
    );
    Ok(purchase_from_entity(purchase))
}

/// Sellers see what they sold, everyone else what they bought; newest first.
pub async fn history(state: &AppState, user: &CurrentUser) -> AppResult<History> {
    let (kind, sql) = if user.is_seller() {
        (
            HistoryKind::Sales,
            r#"
            SELECT p.id, p.title, p.price, p.purchase_date, u.username AS counterparty
            FROM purchases p
            JOIN users u ON p.buyer_id = u.id
            WHERE p.seller_id = ?
            ORDER BY p.purchase_date DESC, p.id DESC
            "#,
        )
    } else {
        (
            HistoryKind::Purchases,
            r#"
            SELECT p.id, p.title, p.price, p.purchase_date, u.username AS counterparty
            FROM purchases p
            JOIN users u ON p.seller_id = u.id
            WHERE p.buyer_id = ?
            ORDER BY p.purchase_date DESC, p.id DESC
            "#,
        )
    };

    let entries = sqlx::query_as::<_, HistoryEntry>(sql)
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(History { kind, entries })
}

fn purchase_from_entity(model: PurchaseModel) -> Purchase {
    Purchase {
        id: model.id,
        buyer_id: model.buyer_id,
        item_id: model.item_id,
        seller_id: model.seller_id,
        title: model.title,
        price: model.price,
        purchase_date: model.purchase_date,
    }
}
