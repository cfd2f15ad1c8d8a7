//! Bounding box inspection command.

use console::style;

use crate::fusion::SearchQuery;
use crate::geo::angular_degrees_to_meters;
use crate::providers::overpass::map_query;
use crate::providers::OverpassConfig;

/// Print the box both providers would receive for `query`.
pub fn cmd_bbox(query: SearchQuery) -> anyhow::Result<()> {
    let bbox = query.bounding_box();

    println!("{} center     {}", style("→").cyan(), query.center);
    println!("  south-west {}", bbox.south_west);
    println!("  north-east {}", bbox.north_east);
    println!(
        "  side       {}° (~{:.1} m)",
        query.size,
        angular_degrees_to_meters(query.size)
    );
    println!("  yelp       bounds={}", bbox.to_yelp_bounds());
    println!(
        "  overpass   {}",
        map_query(&bbox, OverpassConfig::default().query_timeout_secs)
    );
    Ok(())
}
