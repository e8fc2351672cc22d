use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    AllocationGroup, AllocationGroupItem, AllocationSuggestion, Asset, GroupItemDetail,
    GroupSuggestion, PlanAllocation,
};
use crate::services::asset_matcher::{match_asset, AssetDescriptor};
use crate::services::numeric::{percentage_of, share_of, to_f64};
use crate::services::valuation_service::ValuationSnapshot;

pub const UNKNOWN_ASSET_NAME: &str = "미확인 자산";

/// Suggestion for one individual target against a valuation snapshot.
///
/// Unmatched targets, a zero total and missing prices all degrade to zero or
/// `None` fields.
pub fn suggest_allocation(
    allocation: &PlanAllocation,
    assets: &[Asset],
    snapshot: &ValuationSnapshot,
) -> AllocationSuggestion {
    let total = &snapshot.total_value;
    let target_value = share_of(total, &allocation.target_percentage);

    let matched = match_asset(&AssetDescriptor::from(allocation), assets);
    let current_value = matched
        .map(|asset| snapshot.market_value(&asset.id))
        .unwrap_or_else(BigDecimal::zero);

    let current_percentage = percentage_of(&current_value, total);
    let target_percentage = to_f64(&allocation.target_percentage);
    let suggested_amount = &target_value - &current_value;
    let suggested_quantity = matched.and_then(|asset| suggested_quantity(asset, &suggested_amount, snapshot));

    let asset_name = allocation
        .display_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| matched.map(|a| a.name.clone()))
        .or_else(|| allocation.ticker.clone())
        .or_else(|| allocation.alias.clone())
        .unwrap_or_else(|| UNKNOWN_ASSET_NAME.to_string());

    AllocationSuggestion {
        asset_id: matched.map(|a| a.id),
        asset_name,
        ticker: matched
            .and_then(|a| a.ticker.clone())
            .or_else(|| allocation.ticker.clone()),
        alias: allocation.alias.clone(),
        current_value,
        current_percentage,
        target_percentage,
        difference_percentage: target_percentage - current_percentage,
        target_value,
        suggested_amount,
        suggested_quantity,
        is_matched: matched.is_some(),
    }
}

/// Units to trade for `amount`, given the matched asset's native price and
/// the snapshot's rate into the reporting currency.
fn suggested_quantity(asset: &Asset, amount: &BigDecimal, snapshot: &ValuationSnapshot) -> Option<BigDecimal> {
    let price = snapshot.entry(&asset.id)?.current_price.clone()?;
    let unit_value = price * snapshot.rate_for(&asset.currency)?;
    if unit_value <= BigDecimal::zero() {
        return None;
    }
    Some(amount / unit_value)
}

/// One suggestion for the group total. Members only report what they hold.
pub fn suggest_group(
    group: &AllocationGroup,
    items: &[AllocationGroupItem],
    assets: &[Asset],
    snapshot: &ValuationSnapshot,
) -> GroupSuggestion {
    let total = &snapshot.total_value;
    let target_value = share_of(total, &group.target_percentage);

    let mut current_value = BigDecimal::zero();
    let details: Vec<GroupItemDetail> = items
        .iter()
        .map(|item| {
            let matched = match_asset(&AssetDescriptor::from(item), assets);
            let item_value = matched
                .map(|asset| snapshot.market_value(&asset.id))
                .unwrap_or_else(BigDecimal::zero);
            current_value += &item_value;

            GroupItemDetail {
                asset_id: matched.map(|a| a.id),
                asset_name: matched.map(|a| a.name.clone()),
                ticker: item.ticker.clone(),
                alias: item.alias.clone(),
                current_value: item_value,
                is_matched: matched.is_some(),
            }
        })
        .collect();

    let current_percentage = percentage_of(&current_value, total);
    let target_percentage = to_f64(&group.target_percentage);

    GroupSuggestion {
        group_id: group.id,
        group_name: group.name.clone(),
        target_percentage,
        current_percentage,
        difference_percentage: target_percentage - current_percentage,
        suggested_amount: &target_value - &current_value,
        current_value,
        target_value,
        items: details,
    }
}
