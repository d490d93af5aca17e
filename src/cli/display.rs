use prettytable::{cell, row, Row};
use serde::Serialize;

use super::table::ToRow;
use crate::rib::CommunityList;
use crate::route::Route;
use crate::utils::{asn_to_display, EMPTY_VALUE};

#[derive(Serialize)]
#[serde(transparent)]
pub struct RouteRow(pub Route);

impl ToRow for RouteRow {
    fn columns() -> Row {
        row!["Prefix", "Next Hop", "Age", "AS Path", "Communities"]
    }

    fn to_row(&self) -> Row {
        let route = &self.0;
        let next_hop = if route.next_hop.is_empty() {
            EMPTY_VALUE.to_string()
        } else {
            route.next_hop.clone()
        };
        let as_path = route
            .as_path
            .iter()
            .map(|asn| asn_to_display(*asn))
            .collect::<Vec<_>>()
            .join(" ");
        let communities = CommunityList::from(route.communities.as_slice()).to_string();
        row![route.prefix, next_hop, route.age, as_path, communities]
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct PrefixRow(pub String);

impl ToRow for PrefixRow {
    fn columns() -> Row {
        row!["Prefix"]
    }

    fn to_row(&self) -> Row {
        row![self.0]
    }
}

/// (Feed URL, active routes)
#[derive(Serialize)]
pub struct FeedStatsRow(pub String, pub usize);

impl ToRow for FeedStatsRow {
    fn columns() -> Row {
        row!["Feed", "Active Routes"]
    }

    fn to_row(&self) -> Row {
        row![self.0, self.1]
    }
}
