fn main() {
    mergepool::main();
}
