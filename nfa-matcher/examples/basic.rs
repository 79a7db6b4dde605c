use nfa_matcher::{
    matcher::{MatchKind, Regex},
    nfa::backtrack,
};

fn main() {
    // The `[class]+` shape runs on the byte-table scanner, no NFA at all.
    let re = Regex::new("[0-9]+").unwrap();
    assert!(re.is_accelerated());
    let hay = "1 22 333";
    for m in re.find_iter(hay) {
        println!("{:?} -> {:?}", m.range(), &hay[m.range()]);
    }

    // Everything else goes through the NFA and the bounded backtracker.
    let re = Regex::new(r"(?m)^(\w+): (\d+)$").unwrap();
    assert!(!re.is_accelerated());
    let hay = "width: 80\nheight: 24\n";
    for m in re.find_iter(hay) {
        println!("{:?}", &hay[m.range()]);
    }

    // Leftmost-longest semantics, the POSIX behavior.
    let re = Regex::builder()
        .backtrack(backtrack::Config::new().match_kind(MatchKind::LeftmostLongest))
        .build("sam|samwise")
        .unwrap();
    println!("{:?}", re.find("samwise went home"));
}
