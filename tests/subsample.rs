use phylonet::io::{read_edge_list, read_node_table, write_replicates};
use phylonet::{Experiment, ExperimentConfig, Method};

const NODES: &str = "Seq_ID\tPhylum\nA\tphy1\nB\tphy1\nC\tphy2\nD\tphy2\n";

#[test]
fn capped_sample_equal_to_full_network_reproduces_baseline() {
    let nodes = read_node_table(NODES.as_bytes(), "Phylum", b'\t').unwrap();
    let edges = read_edge_list("A\tB\nC\tD\n".as_bytes()).unwrap();

    for method in [Method::Walktrap, Method::Louvain] {
        let config = ExperimentConfig::new(2).with_replicates(20).with_method(method);
        let experiment = Experiment::run(&nodes, edges.clone(), config).unwrap();
        let baseline = experiment.baseline.modularity.unwrap();
        assert!((baseline - 0.5).abs() < 1e-12);
        assert!(experiment.scores().iter().all(|q| *q == Some(baseline)));

        let summary = experiment.summary();
        assert_eq!(summary.scored, 20);
        assert_eq!(summary.sd, Some(0.0));
    }
}

#[test]
fn edges_to_unknown_nodes_are_dropped_and_counted() {
    let nodes = read_node_table(NODES.as_bytes(), "Phylum", b'\t').unwrap();
    let edges = read_edge_list("A\tB\t0.9\nC\tD\t0.8\nA\tZ\t0.7\nZ\tD\t0.6\n".as_bytes()).unwrap();
    assert_eq!(edges.len(), 4);

    let experiment = Experiment::run(&nodes, edges, ExperimentConfig::new(2).with_replicates(3)).unwrap();
    assert_eq!(experiment.cleaning.input, 4);
    assert_eq!(experiment.cleaning.retained, 2);
    assert_eq!(experiment.cleaning.dropped, 2);
    assert_eq!(experiment.baseline.edges, 2);
}

#[test]
fn replicate_table_marks_missing_scores() {
    let nodes = read_node_table("id\tPhylum\nA\tp1\nB\tp2\nC\tp1\nD\tp2\n".as_bytes(), "Phylum", b'\t').unwrap();
    let edges = read_edge_list("A\tC\nB\tD\n".as_bytes()).unwrap();
    let experiment = Experiment::run(&nodes, edges, ExperimentConfig::new(1).with_replicates(2)).unwrap();

    let mut out = Vec::new();
    write_replicates(&mut out, &experiment).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "replicate\tnodes\tedges\tcommunities\tmodularity");
    assert_eq!(lines[1], "1\t2\t0\tNA\tNA");
    assert_eq!(lines[2], "2\t2\t0\tNA\tNA");
}

#[test]
fn same_seed_gives_same_replicates() {
    let rows: String = (0..60).map(|i| format!("n{i}\tp{}\n", i % 4)).collect();
    let nodes = read_node_table(format!("Seq_ID\tPhylum\n{rows}").as_bytes(), "Phylum", b'\t').unwrap();
    let edge_text: String = (0..60)
        .flat_map(|i| [format!("n{i}\tn{}\n", (i + 1) % 60), format!("n{i}\tn{}\n", (i + 11) % 60)])
        .collect();
    let edges = read_edge_list(edge_text.as_bytes()).unwrap();

    let config = ExperimentConfig::new(5).with_replicates(12).with_seed(2024);
    let first = Experiment::run(&nodes, edges.clone(), config.clone()).unwrap();
    let second = Experiment::run(&nodes, edges, config).unwrap();
    assert_eq!(first.replicates, second.replicates);
    assert_eq!(first.summary(), second.summary());
}
