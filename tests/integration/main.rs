mod crawl_tests;
mod fleet_tests;
