fn main() {
    matrixlab_lib::run()
}
