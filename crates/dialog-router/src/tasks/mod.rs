pub mod count_date_search;
pub mod counts;
pub mod market_rank;
pub mod simple_lookup;
pub mod stock_search;
